/// A configuration value with a validated range, named for diagnostics.
#[derive(Clone, Debug)]
pub struct ConfigOption<T> {
    pub name: &'static str,
    pub min: T,
    pub max: T,
    pub value: T,
}

impl<T: PartialOrd + Copy + std::fmt::Debug> ConfigOption<T> {
    /// Sets the value if it lies within `[min, max]`, otherwise leaves it
    /// unchanged and reports why.
    pub fn try_set(&mut self, value: T) -> Result<(), String> {
        if value < self.min || value > self.max {
            return Err(format!(
                "{} must lie in [{:?}, {:?}]",
                self.name, self.min, self.max
            ));
        }
        self.value = value;
        Ok(())
    }
}
