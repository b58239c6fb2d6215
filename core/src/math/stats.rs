pub struct StatsHelper;

impl StatsHelper {
    pub fn rms(samples: &[f64]) -> f64 {
        if samples.is_empty() {
            return 0.0;
        }
        let sum_sq: f64 = samples.iter().map(|&v| v * v).sum();
        (sum_sq / samples.len() as f64).sqrt()
    }

    pub fn mean(samples: &[f64]) -> f64 {
        if samples.is_empty() {
            return 0.0;
        }
        samples.iter().sum::<f64>() / samples.len() as f64
    }

    /// Smallest and largest value. `None` for an empty iterator.
    pub fn min_max<I>(values: I) -> Option<(f64, f64)>
    where
        I: IntoIterator<Item = f64>,
    {
        values.into_iter().fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rms_zero_sequence_yields_zero() {
        assert_eq!(StatsHelper::rms(&[]), 0.0);
        assert_eq!(StatsHelper::rms(&[0.0, 0.0]), 0.0);
    }

    #[test]
    fn rms_handles_single_value() {
        assert_eq!(StatsHelper::rms(&[4.0]), 4.0);
    }

    #[test]
    fn min_max_of_values() {
        assert_eq!(StatsHelper::min_max(vec![3.0, -1.0, 2.0]), Some((-1.0, 3.0)));
        assert_eq!(StatsHelper::min_max(Vec::<f64>::new()), None);
        assert_eq!(StatsHelper::mean(&[1.0, 3.0]), 2.0);
    }
}
