/// Running mean of `value^power`.
#[derive(Debug, Clone)]
pub struct Statistics {
    pub count: usize,
    pub aggregate: f64,
    pub power: i32,
}

impl Statistics {
    pub fn new(power: i32) -> Self {
        Self {
            count: 0,
            aggregate: 0.0,
            power,
        }
    }

    pub fn update(&mut self, value: f64) {
        self.count += 1;
        self.aggregate += if self.power == 1 {
            value
        } else {
            value.powi(self.power)
        };
    }

    pub fn average(&self) -> f64 {
        if self.count == 0 {
            return self.aggregate;
        }
        self.aggregate / self.count as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_empty_average_is_zero() {
        assert_eq!(Statistics::new(2).average(), 0.0);
    }

    #[test]
    fn test_powers() {
        let mut mean = Statistics::new(1);
        let mut square = Statistics::new(2);
        let mut fourth = Statistics::new(4);
        for v in [1.0, -2.0, 3.0] {
            mean.update(v);
            square.update(v);
            fourth.update(v);
        }
        assert_relative_eq!(mean.average(), 2.0 / 3.0);
        assert_relative_eq!(square.average(), 14.0 / 3.0);
        assert_relative_eq!(fourth.average(), 98.0 / 3.0);
    }
}
