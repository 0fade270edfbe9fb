use std::{fmt::Display, ops::Deref};

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Percentage(f64);

impl Display for Percentage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}%", self.0.round())
    }
}

impl Percentage {
    pub fn new_opt(value: f64) -> Option<Percentage> {
        if value < 0. || value.is_nan() {
            None
        } else {
            Some(Percentage(value))
        }
    }

    /// Share of anything in an empty whole.
    pub fn unbounded() -> Percentage {
        Percentage(f64::INFINITY)
    }

    /// Same value clamped to 100, used for progress bars.
    pub fn capped(self) -> Percentage {
        Percentage(self.0.min(100.))
    }

    pub fn exceeds_whole(self) -> bool {
        self.0 > 100.
    }
}

impl Deref for Percentage {
    type Target = f64;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Share of `value` in `whole`. An empty whole yields 0% rather than dividing by zero.
pub fn ratio_percentage(value: u32, whole: u32) -> Percentage {
    if whole == 0 {
        return Percentage(0.);
    }
    Percentage(f64::from(value) / f64::from(whole) * 100.)
}
