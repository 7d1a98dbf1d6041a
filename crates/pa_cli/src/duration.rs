use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// A duration written like `1h`, `30m`, `1d` or `1h15m30s`. A trailing bare
/// number counts as seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HumanDuration(pub Duration);

impl FromStr for HumanDuration {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut total: u64 = 0;
        let mut number: Option<u64> = None;
        let mut seen_any = false;

        for c in s.trim().chars() {
            if let Some(digit) = c.to_digit(10) {
                let current = number.unwrap_or(0);
                number = Some(
                    current
                        .checked_mul(10)
                        .and_then(|n| n.checked_add(u64::from(digit)))
                        .ok_or_else(|| format!("Duration too large: {}", s))?,
                );
                continue;
            }
            if c.is_whitespace() {
                continue;
            }

            let value = number
                .take()
                .ok_or_else(|| format!("Unit '{}' without a number in: {}", c, s))?;
            let unit = match c {
                's' => 1,
                'm' => 60,
                'h' => 3_600,
                'd' => 86_400,
                _ => return Err(format!("Invalid duration unit: {}", c)),
            };
            total = value
                .checked_mul(unit)
                .and_then(|secs| total.checked_add(secs))
                .ok_or_else(|| format!("Duration too large: {}", s))?;
            seen_any = true;
        }

        if let Some(seconds) = number {
            total = total
                .checked_add(seconds)
                .ok_or_else(|| format!("Duration too large: {}", s))?;
            seen_any = true;
        }

        if !seen_any {
            return Err("Duration must include a number".to_string());
        }
        if total == 0 {
            return Err("Duration must be greater than zero".to_string());
        }
        Ok(HumanDuration(Duration::from_secs(total)))
    }
}

impl fmt::Display for HumanDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut secs = self.0.as_secs();
        let mut parts = String::new();
        for (unit, size) in [("d", 86_400), ("h", 3_600), ("m", 60)] {
            if secs >= size {
                parts.push_str(&format!("{}{}", secs / size, unit));
                secs %= size;
            }
        }
        if secs > 0 || parts.is_empty() {
            parts.push_str(&format!("{}s", secs));
        }
        f.write_str(&parts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: &str) -> u64 {
        s.parse::<HumanDuration>().unwrap().0.as_secs()
    }

    #[test]
    fn test_parse() {
        assert_eq!(secs("30m"), 1_800);
        assert_eq!(secs("1h15m30s"), 4_530);
        assert_eq!(secs("1d"), 86_400);
        assert_eq!(secs("90"), 90);
        assert_eq!(secs("1h 5"), 3_605);
    }

    #[test]
    fn test_invalid() {
        assert!("".parse::<HumanDuration>().is_err());
        assert!("h".parse::<HumanDuration>().is_err());
        assert!("5w".parse::<HumanDuration>().is_err());
        assert!("0s".parse::<HumanDuration>().is_err());
        assert!("99999999999999999999s".parse::<HumanDuration>().is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(HumanDuration(Duration::from_secs(4_530)).to_string(), "1h15m30s");
        assert_eq!(HumanDuration(Duration::from_secs(3_600)).to_string(), "1h");
        assert_eq!(HumanDuration(Duration::from_secs(45)).to_string(), "45s");
    }
}
