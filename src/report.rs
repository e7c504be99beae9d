use std::fmt::Write;

use crate::core::{Projection, YearSnapshot};

const RAN_OUT_MARKER: &str = "!!!!!! RAN OUT OF MONEY !!!!!";
const COLUMN_GAP: &str = "       ";

/// Whole-dollar amount with thousands separators, e.g. `-$1,234,567`.
/// Cents are truncated, not rounded.
pub fn format_currency(value: f64) -> String {
    let dollars = if value.is_finite() {
        format!("{:.0}", value.abs().trunc())
    } else {
        format!("{}", value.abs())
    };
    let mut grouped = String::with_capacity(dollars.len() + dollars.len() / 3);
    for (i, c) in dollars.chars().enumerate() {
        if i > 0 && (dollars.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    if value < 0.0 {
        format!("-${grouped}")
    } else {
        format!("${grouped}")
    }
}

/// One report row, preceded by an indented line listing the year's events.
pub fn render_year(year: &YearSnapshot) -> String {
    let mut out = String::new();
    if !year.events.is_empty() {
        let _ = writeln!(out, "  {}", year.events.join(","));
    }

    let mut line = format!(
        "{} {} {COLUMN_GAP} {} {COLUMN_GAP} income={} expenses={} returns={}",
        year.year,
        year.age,
        format_currency(year.total_capital),
        format_currency(year.income),
        format_currency(year.expenses),
        format_currency(year.returns),
    );
    if year.ran_out_of_money {
        line.push(' ');
        line.push_str(RAN_OUT_MARKER);
    }
    out.push_str(&line);
    out.push('\n');
    out
}

pub fn summary_line(projection: &Projection) -> String {
    let capital = format_currency(projection.final_capital);
    match projection.ran_out_of_money_age {
        None => format!("Didn't run out of money: {capital}"),
        Some(age) => format!("Ran out of money at {age}: {capital}"),
    }
}

pub fn render_projection(projection: &Projection) -> String {
    let mut out = projection
        .years
        .iter()
        .map(render_year)
        .collect::<String>();
    out.push_str(&summary_line(projection));
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_year() -> YearSnapshot {
        YearSnapshot {
            year: 2025,
            age: 40,
            total_capital: -95_082.0,
            income: 51_500.0,
            expenses: 41_200.0,
            returns: -5_382.0,
            return_rate: 0.06,
            inflation_rate: 0.03,
            events: vec!["capital-400000".to_string()],
            ran_out_of_money: false,
        }
    }

    #[test]
    fn currency_groups_thousands() {
        assert_eq!(format_currency(0.0), "$0");
        assert_eq!(format_currency(999.0), "$999");
        assert_eq!(format_currency(1_000.0), "$1,000");
        assert_eq!(format_currency(300_000.0), "$300,000");
        assert_eq!(format_currency(1_234_567.89), "$1,234,567");
        assert_eq!(format_currency(-1_234_567.9), "-$1,234,567");
        assert_eq!(format_currency(-12.0), "-$12");
    }

    #[test]
    fn currency_keeps_every_digit_of_huge_amounts() {
        assert_eq!(format_currency(1e21), "$1,000,000,000,000,000,000,000");
        assert_eq!(
            format_currency(18_446_744_073_709_551_616.0),
            "$18,446,744,073,709,551,616"
        );
        assert_eq!(format_currency(-1e21), "-$1,000,000,000,000,000,000,000");
        assert_eq!(format_currency(f64::INFINITY), "$inf");
        assert_eq!(format_currency(f64::NEG_INFINITY), "-$inf");
        assert_eq!(format_currency(f64::NAN), "$NaN");
    }

    #[test]
    fn year_row_lists_events_first() {
        let rendered = render_year(&sample_year());
        assert_eq!(
            rendered,
            "  capital-400000\n\
             2025 40         -$95,082         income=$51,500 expenses=$41,200 returns=-$5,382\n"
        );
    }

    #[test]
    fn year_row_flags_ran_out_year() {
        let mut year = sample_year();
        year.events.clear();
        year.ran_out_of_money = true;
        let rendered = render_year(&year);
        assert!(!rendered.starts_with("  "));
        assert!(rendered.trim_end().ends_with(RAN_OUT_MARKER));
    }

    #[test]
    fn summary_distinguishes_outcomes() {
        let mut projection = Projection {
            target_age: 85,
            years: vec![sample_year()],
            final_year: 2070,
            final_age: 85,
            final_capital: 2_500_000.0,
            ran_out_of_money_age: None,
        };
        assert_eq!(
            summary_line(&projection),
            "Didn't run out of money: $2,500,000"
        );

        projection.ran_out_of_money_age = Some(72);
        projection.final_capital = -10_000.0;
        assert_eq!(summary_line(&projection), "Ran out of money at 72: -$10,000");

        let report = render_projection(&projection);
        assert!(report.starts_with("  capital-400000\n2025 40"));
        assert!(report.ends_with("Ran out of money at 72: -$10,000\n"));
    }
}
