use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Errors raised while parsing events or assembling an event schedule.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EventError {
    #[error("invalid event `{event}`: expected <field><op><value>")]
    InvalidEvent { event: String },

    #[error("unknown field `{field}` in event `{event}`")]
    UnknownField { field: String, event: String },

    #[error("division by zero in event `{event}`")]
    DivisionByZero { event: String },

    #[error("invalid schedule entry `{entry}`: expected <age>:<event>[,<event>...]")]
    InvalidScheduleEntry { entry: String },

    #[error("age {age}: {source}")]
    AtAge { age: i32, source: Box<EventError> },
}

impl EventError {
    fn at_age(self, age: i32) -> Self {
        EventError::AtAge {
            age,
            source: Box::new(self),
        }
    }
}

/// Simulation field an event can target.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Field {
    Capital,
    Income,
    Expenses,
    ReturnRate,
    Inflation,
}

impl Field {
    pub const ALL: [Field; 5] = [
        Field::Capital,
        Field::Income,
        Field::Expenses,
        Field::ReturnRate,
        Field::Inflation,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Field::Capital => "capital",
            Field::Income => "income",
            Field::Expenses => "expenses",
            Field::ReturnRate => "return_rate",
            Field::Inflation => "inflation",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.as_str() == name)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Operator {
    Assign,
    Subtract,
    Add,
    Multiply,
    Divide,
}

impl Operator {
    pub fn from_symbol(symbol: char) -> Option<Self> {
        match symbol {
            '=' => Some(Operator::Assign),
            '-' => Some(Operator::Subtract),
            '+' => Some(Operator::Add),
            '*' => Some(Operator::Multiply),
            '/' => Some(Operator::Divide),
            _ => None,
        }
    }

    pub fn symbol(self) -> char {
        match self {
            Operator::Assign => '=',
            Operator::Subtract => '-',
            Operator::Add => '+',
            Operator::Multiply => '*',
            Operator::Divide => '/',
        }
    }

    pub fn apply(self, current: f64, value: f64) -> f64 {
        match self {
            Operator::Assign => value,
            Operator::Subtract => current - value,
            Operator::Add => current + value,
            Operator::Multiply => current * value,
            Operator::Divide => current / value,
        }
    }
}

/// A single parameter change such as `capital-400000` or `expenses*0.8`.
///
/// The field is the leading run of letters and underscores, the operator is
/// the character right after it, and everything else is a numeric literal
/// that may carry its own sign (`income=-500`, `capital--100`).
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Event {
    field: Field,
    op: Operator,
    value: f64,
}

impl Event {
    pub fn new(field: Field, op: Operator, value: f64) -> Result<Self, EventError> {
        let event = Event { field, op, value };
        if !value.is_finite() {
            return Err(EventError::InvalidEvent {
                event: event.to_string(),
            });
        }
        if op == Operator::Divide && value == 0.0 {
            return Err(EventError::DivisionByZero {
                event: event.to_string(),
            });
        }
        Ok(event)
    }

    pub fn parse(text: &str) -> Result<Self, EventError> {
        let invalid = || EventError::InvalidEvent {
            event: text.to_string(),
        };

        let trimmed = text.trim();
        let name_end = trimmed
            .find(|c: char| !(c.is_ascii_alphabetic() || c == '_'))
            .ok_or_else(invalid)?;
        let name = &trimmed[..name_end];
        if name.is_empty() {
            return Err(invalid());
        }
        let field = Field::from_name(name).ok_or_else(|| EventError::UnknownField {
            field: name.to_string(),
            event: text.to_string(),
        })?;

        let rest = trimmed[name_end..].trim_start();
        let mut chars = rest.chars();
        let op = chars
            .next()
            .and_then(Operator::from_symbol)
            .ok_or_else(invalid)?;
        let value = chars
            .as_str()
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(invalid)?;

        if op == Operator::Divide && value == 0.0 {
            return Err(EventError::DivisionByZero {
                event: text.to_string(),
            });
        }

        Ok(Event { field, op, value })
    }

    pub fn field(&self) -> Field {
        self.field
    }

    pub fn op(&self) -> Operator {
        self.op
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    /// Returns the field's new value given its current one.
    pub fn apply(&self, current: f64) -> f64 {
        self.op.apply(current, self.value)
    }
}

impl FromStr for Event {
    type Err = EventError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Event::parse(s)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.field, self.op.symbol(), self.value)
    }
}

/// Validated, read-only mapping from age to the events applied that year.
///
/// Textual form is `40:capital-400000 65:income=0,return_rate=0.04`: entries
/// in ascending age order separated by whitespace, events within an entry
/// separated by commas.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventSchedule {
    by_age: BTreeMap<i32, Vec<Event>>,
}

impl EventSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses every event up front. Repeated ages append in iteration order.
    pub fn from_raw<I, E, S>(raw: I) -> Result<Self, EventError>
    where
        I: IntoIterator<Item = (i32, E)>,
        E: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut schedule = Self::new();
        for (age, texts) in raw {
            let events = texts
                .into_iter()
                .map(|text| Event::parse(text.as_ref()).map_err(|e| e.at_age(age)))
                .collect::<Result<Vec<_>, _>>()?;
            schedule.extend_age(age, events);
        }
        Ok(schedule)
    }

    pub fn from_events(events: impl IntoIterator<Item = (i32, Event)>) -> Self {
        let mut schedule = Self::new();
        for (age, event) in events {
            schedule.extend_age(age, [event]);
        }
        schedule
    }

    fn extend_age(&mut self, age: i32, events: impl IntoIterator<Item = Event>) {
        let mut events = events.into_iter().peekable();
        if events.peek().is_none() {
            return;
        }
        self.by_age.entry(age).or_default().extend(events);
    }

    pub fn events_at(&self, age: i32) -> Option<&[Event]> {
        self.by_age.get(&age).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.by_age.is_empty()
    }

    /// Iterates ages in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = (i32, &[Event])> {
        self.by_age
            .iter()
            .map(|(age, events)| (*age, events.as_slice()))
    }
}

impl FromStr for EventSchedule {
    type Err = EventError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut entries = Vec::new();
        for entry in s.split_whitespace() {
            let bad_entry = || EventError::InvalidScheduleEntry {
                entry: entry.to_string(),
            };
            let (age, events) = entry.split_once(':').ok_or_else(bad_entry)?;
            let age = age.parse::<i32>().map_err(|_| bad_entry())?;
            entries.push((age, events.split(',')));
        }
        Self::from_raw(entries)
    }
}

impl fmt::Display for EventSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, (age, events)) in self.iter().enumerate() {
            if idx > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{age}:")?;
            for (event_idx, event) in events.iter().enumerate() {
                if event_idx > 0 {
                    f.write_str(",")?;
                }
                write!(f, "{event}")?;
            }
        }
        Ok(())
    }
}
