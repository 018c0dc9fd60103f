use std::hint::black_box;
use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};

use tally_accounting::Amount;
use tally_payroll::schedule::tables_2005;
use tally_payroll::{PayrollTaxCalculator, Scale};

fn calculator(scale: Scale, weeks: f64) -> PayrollTaxCalculator {
    let table = tables_2005()
        .expect("2005 schedule")
        .into_iter()
        .find(|t| t.scale() == scale)
        .expect("table for scale");
    let mut calc = PayrollTaxCalculator::new(Arc::new(table));
    calc.set_weeks(weeks).expect("positive weeks");
    calc.set_amounts(Amount::ZERO, Amount::ZERO, Amount::ZERO).expect("zero slots");
    calc
}

fn bench_given_salary(c: &mut Criterion) {
    tally_observability::init();
    let mut group = c.benchmark_group("withhold_given_salary");
    group.throughput(Throughput::Elements(1));

    for (label, weeks) in [("weekly", 1.0), ("fortnightly", 2.0), ("monthly", 52.0 / 12.0)] {
        group.bench_with_input(BenchmarkId::new("scale_2", label), &weeks, |b, &weeks| {
            let mut calc = calculator(Scale::TaxFreeThresholdWithLeaveLoading, weeks);
            b.iter(|| {
                calc.set_salary(black_box(Amount::units(1096))).expect("salary");
                black_box(calc.calculate_given_salary().expect("withholding"))
            });
        });
    }

    group.finish();
}

fn bench_given_paycheck(c: &mut Criterion) {
    let mut group = c.benchmark_group("salary_given_paycheck");

    for paycheck in [231i64, 1_000, 10_000] {
        group.bench_with_input(BenchmarkId::new("scale_7", paycheck), &paycheck, |b, &paycheck| {
            let mut calc = calculator(Scale::TaxFreeThresholdNoLeaveLoading, 1.0);
            b.iter(|| {
                calc.set_paycheck(black_box(Amount::units(paycheck))).expect("paycheck");
                black_box(calc.calculate_given_paycheck().expect("inverse"))
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_given_salary, bench_given_paycheck);
criterion_main!(benches);
