use super::event::{Event, EventSchedule, Field};
use super::types::{PlannerConfig, Projection, YearSnapshot};

/// Year-by-year net worth simulation.
///
/// All state changes happen in [`RetirementPlanner::tick_year`]; everything
/// else is a read.
#[derive(Debug, Clone)]
pub struct RetirementPlanner {
    birth_year: i32,
    year: i32,
    total_capital: f64,
    expenses: f64,
    income: f64,
    return_rate: f64,
    inflation_rate: f64,
    returns: f64,
    ran_out_of_money_age: Option<i32>,
    events: EventSchedule,
}

impl RetirementPlanner {
    pub fn new(config: PlannerConfig) -> Self {
        Self {
            birth_year: config.birth_year,
            year: config.current_year,
            total_capital: config.starting_capital,
            expenses: config.starting_expenses,
            income: config.starting_income,
            return_rate: config.return_rate,
            inflation_rate: config.inflation_rate,
            returns: (config.starting_capital * config.return_rate).trunc(),
            ran_out_of_money_age: None,
            events: config.events,
        }
    }

    /// Calls `on_each_year` with the current state, then ticks, for every age
    /// strictly below `target_age`.
    pub fn simulate_until_age<F>(&mut self, target_age: i32, mut on_each_year: F)
    where
        F: FnMut(&Self),
    {
        while self.age() < target_age {
            on_each_year(self);
            self.tick_year();
        }
    }

    /// Runs `num_years + 1` callback/tick rounds, the starting year included.
    pub fn simulate_num_years<F>(&mut self, num_years: u32, mut on_each_year: F)
    where
        F: FnMut(&Self),
    {
        for _ in 0..=num_years {
            on_each_year(self);
            self.tick_year();
        }
    }

    pub fn tick_year(&mut self) {
        self.year += 1;

        self.expenses += inflation_increment(self.expenses, self.inflation_rate);
        self.income += inflation_increment(self.income, self.inflation_rate);

        self.apply_year_events();

        let prev_total_capital = self.total_capital;

        self.total_capital -= self.expenses;
        self.total_capital += self.income;
        self.returns = (self.total_capital * self.return_rate).trunc();
        self.total_capital += self.returns;

        if self.ran_out_of_money_age.is_none()
            && prev_total_capital > 0.0
            && self.total_capital < 0.0
        {
            let age = self.age();
            tracing::info!(
                age,
                year = self.year,
                total_capital = self.total_capital,
                "ran out of money"
            );
            self.ran_out_of_money_age = Some(age);
        }
    }

    fn apply_year_events(&mut self) {
        let age = self.age();
        let count = self.events.events_at(age).map_or(0, <[Event]>::len);
        for idx in 0..count {
            let Some(&event) = self.events.events_at(age).and_then(|events| events.get(idx))
            else {
                break;
            };
            let slot = self.field_mut(event.field());
            let before = *slot;
            *slot = event.apply(before);
            tracing::debug!(age, event = %event, before, after = *slot, "applied event");
        }
    }

    fn field_mut(&mut self, field: Field) -> &mut f64 {
        match field {
            Field::Capital => &mut self.total_capital,
            Field::Income => &mut self.income,
            Field::Expenses => &mut self.expenses,
            Field::ReturnRate => &mut self.return_rate,
            Field::Inflation => &mut self.inflation_rate,
        }
    }

    pub fn field(&self, field: Field) -> f64 {
        match field {
            Field::Capital => self.total_capital,
            Field::Income => self.income,
            Field::Expenses => self.expenses,
            Field::ReturnRate => self.return_rate,
            Field::Inflation => self.inflation_rate,
        }
    }

    /// Events scheduled for the current age.
    pub fn year_events(&self) -> Option<&[Event]> {
        self.events.events_at(self.age())
    }

    pub fn events(&self) -> &EventSchedule {
        &self.events
    }

    pub fn birth_year(&self) -> i32 {
        self.birth_year
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn age(&self) -> i32 {
        self.year - self.birth_year
    }

    pub fn total_capital(&self) -> f64 {
        self.total_capital
    }

    pub fn expenses(&self) -> f64 {
        self.expenses
    }

    pub fn income(&self) -> f64 {
        self.income
    }

    pub fn returns(&self) -> f64 {
        self.returns
    }

    pub fn return_rate(&self) -> f64 {
        self.return_rate
    }

    pub fn inflation_rate(&self) -> f64 {
        self.inflation_rate
    }

    pub fn ran_out_of_money_age(&self) -> Option<i32> {
        self.ran_out_of_money_age
    }

    pub fn is_ran_out_of_money_year(&self) -> bool {
        self.ran_out_of_money_age == Some(self.age())
    }

    pub fn snapshot(&self) -> YearSnapshot {
        YearSnapshot {
            year: self.year,
            age: self.age(),
            total_capital: self.total_capital,
            income: self.income,
            expenses: self.expenses,
            returns: self.returns,
            return_rate: self.return_rate,
            inflation_rate: self.inflation_rate,
            events: self
                .year_events()
                .map(|events| events.iter().map(ToString::to_string).collect())
                .unwrap_or_default(),
            ran_out_of_money: self.is_ran_out_of_money_year(),
        }
    }
}

// Truncated, additive: drifts slightly below true compounding.
fn inflation_increment(value: f64, inflation_rate: f64) -> f64 {
    (value * inflation_rate).trunc()
}

pub fn run_projection(config: PlannerConfig, target_age: i32) -> Projection {
    let mut planner = RetirementPlanner::new(config);
    let mut years = Vec::with_capacity(target_age.saturating_sub(planner.age()).max(0) as usize);
    planner.simulate_until_age(target_age, |state| years.push(state.snapshot()));

    Projection {
        target_age,
        years,
        final_year: planner.year(),
        final_age: planner.age(),
        final_capital: planner.total_capital(),
        ran_out_of_money_age: planner.ran_out_of_money_age(),
    }
}
