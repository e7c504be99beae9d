use serde::Serialize;

use super::event::EventSchedule;

#[derive(Debug, Clone)]
pub struct PlannerConfig {
    pub birth_year: i32,
    pub current_year: i32,
    pub starting_capital: f64,
    pub starting_expenses: f64,
    pub starting_income: f64,
    pub return_rate: f64,
    pub inflation_rate: f64,
    pub events: EventSchedule,
}

/// Copy of the reporting fields for one simulated year.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearSnapshot {
    pub year: i32,
    pub age: i32,
    pub total_capital: f64,
    pub income: f64,
    pub expenses: f64,
    pub returns: f64,
    pub return_rate: f64,
    pub inflation_rate: f64,
    pub events: Vec<String>,
    pub ran_out_of_money: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Projection {
    pub target_age: i32,
    pub years: Vec<YearSnapshot>,
    pub final_year: i32,
    pub final_age: i32,
    pub final_capital: f64,
    pub ran_out_of_money_age: Option<i32>,
}
