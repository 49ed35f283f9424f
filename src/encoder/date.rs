//! Timestamp encoding.

use chrono::{Datelike, NaiveDateTime, Timelike, Weekday};

use crate::config::TimeParams;
use crate::sdr::Sdr;

/// Encodes the time of day, and optionally whether the day is in a weekend.
///
/// The time of day is a periodic encoding: `width` consecutive bits on a
/// ring covering 24 hours, the ring being sized so that two times `radius`
/// hours apart do not share any bit. The weekend block, when enabled, is made
/// of two disjoint groups of bits, one for week days and one for week ends.
#[derive(Debug, Clone)]
pub struct DateEncoder {
    time_of_day_width: usize,
    time_of_day_size: usize,
    weekend_width: Option<usize>,
}

impl DateEncoder {
    /// Create a new encoder
    pub fn new(params: &TimeParams) -> DateEncoder {
        let w = params.time_of_day_width;
        let size = (24.0 * w as f64 / params.time_of_day_radius).ceil() as usize;
        DateEncoder {
            time_of_day_width: w,
            time_of_day_size: size.max(w + 1),
            weekend_width: params.weekend_width,
        }
    }

    /// Total number of bits of the encoding.
    pub fn size(&self) -> usize {
        self.time_of_day_size + self.weekend_size()
    }

    fn weekend_size(&self) -> usize {
        self.weekend_width.map_or(0, |w| 2 * w)
    }

    /// Encode a timestamp. Seconds count, the date only matters for the
    /// weekend block.
    pub fn encode(&self, timestamp: NaiveDateTime) -> Sdr {
        let hours = timestamp.hour() as f64
            + timestamp.minute() as f64 / 60.0
            + timestamp.second() as f64 / 3600.0;
        let size = self.time_of_day_size;
        let start = ((hours / 24.0 * size as f64).floor() as usize) % size;
        let time_of_day = (0..self.time_of_day_width).map(move |k| (start + k) % size);

        let weekend = self.weekend_width.into_iter().flat_map(move |w| {
            let is_weekend = matches!(timestamp.weekday(), Weekday::Sat | Weekday::Sun);
            let offset = size + if is_weekend { w } else { 0 };
            offset..offset + w
        });

        Sdr::from_active(self.size(), time_of_day.chain(weekend))
    }
}
