use std::fmt;

/// Summary of a batch generation run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct GenerationStats {
    pub generated: u32,
    pub skipped: u32,
    pub errors: u32,
}

impl GenerationStats {
    pub fn generated(&mut self) {
        self.generated += 1;
    }

    pub fn skipped(&mut self) {
        self.skipped += 1;
    }

    pub fn error(&mut self) {
        self.errors += 1;
    }

    pub fn total(&self) -> u32 {
        self.generated + self.skipped + self.errors
    }
}

impl fmt::Display for GenerationStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.errors > 0 {
            write!(
                f,
                "{} generated, {} already present, {} failed ({} total)",
                self.generated,
                self.skipped,
                self.errors,
                self.total()
            )
        } else if self.skipped > 0 {
            write!(
                f,
                "{} generated, {} already present ({} total)",
                self.generated,
                self.skipped,
                self.total()
            )
        } else {
            write!(f, "{} generated", self.generated)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let mut s = GenerationStats::default();
        s.generated();
        s.skipped();
        s.skipped();
        s.error();
        assert_eq!(s.total(), 4);
        assert_eq!(s.skipped, 2);
    }

    #[test]
    fn display_with_errors() {
        let s = GenerationStats {
            generated: 3,
            skipped: 2,
            errors: 1,
        };
        assert_eq!(
            s.to_string(),
            "3 generated, 2 already present, 1 failed (6 total)"
        );
    }

    #[test]
    fn display_with_skips() {
        let s = GenerationStats {
            generated: 1,
            skipped: 4,
            errors: 0,
        };
        assert_eq!(s.to_string(), "1 generated, 4 already present (5 total)");
    }

    #[test]
    fn display_generated_only() {
        let s = GenerationStats {
            generated: 2,
            ..Default::default()
        };
        assert_eq!(s.to_string(), "2 generated");
    }
}
