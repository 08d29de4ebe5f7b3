//! Analog clock geometry.

use std::f64::consts::{FRAC_PI_2, TAU};

use crate::zone::{ClockSample, ClockZone};

/// Hand angles in radians, measured clockwise from three o'clock so that
/// `(cos, sin)` maps straight onto screen coordinates with y pointing down.
/// Twelve o'clock is `-PI/2`.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct HandAngles {
    pub hour: f64,
    pub minute: f64,
    pub second: f64,
}

impl HandAngles {
    /// Hands sweep continuously: seconds carry milliseconds, minutes carry
    /// seconds and hours carry minutes.
    pub fn from_sample(t: &ClockSample) -> Self {
        let sec = t.seconds as f64 + t.milliseconds as f64 / 1000.0;
        let min = t.minutes as f64 + sec / 60.0;
        let hr = (t.hours % 12) as f64 + min / 60.0;
        Self {
            hour: hr / 12.0 * TAU - FRAC_PI_2,
            minute: min / 60.0 * TAU - FRAC_PI_2,
            second: sec / 60.0 * TAU - FRAC_PI_2,
        }
    }
}

/// "HH:MM:SS" followed by the zone label.
pub fn digital_readout(t: &ClockSample, zone: &ClockZone) -> String {
    format!("{:02}:{:02}:{:02}  {}", t.hours, t.minutes, t.seconds, zone)
}

#[cfg(test)]
mod tests {
    use std::f64::consts::PI;

    use super::*;

    fn t(hours: u32, minutes: u32, seconds: u32, milliseconds: u32) -> ClockSample {
        ClockSample { hours, minutes, seconds, milliseconds }
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_noon_points_up() {
        let hands = HandAngles::from_sample(&t(12, 0, 0, 0));
        assert!(close(hands.hour, -FRAC_PI_2));
        assert!(close(hands.minute, -FRAC_PI_2));
        assert!(close(hands.second, -FRAC_PI_2));
    }

    #[test]
    fn test_three_fifteen_thirty() {
        let hands = HandAngles::from_sample(&t(15, 15, 30, 0));
        // Hour hand is a quarter of the way from 3 to 4.
        assert!(close(hands.hour, (3.25 / 12.0) * TAU - FRAC_PI_2 + (0.5 / 60.0 / 12.0) * TAU));
        assert!(close(hands.minute, (15.5 / 60.0) * TAU - FRAC_PI_2));
        assert!(close(hands.second, PI - FRAC_PI_2));
    }

    #[test]
    fn test_second_hand_sweeps_with_millis() {
        let a = HandAngles::from_sample(&t(0, 0, 10, 0));
        let b = HandAngles::from_sample(&t(0, 0, 10, 500));
        assert!(b.second > a.second);
        assert!(close(b.second - a.second, 0.5 / 60.0 * TAU));
    }

    #[test]
    fn test_digital_readout() {
        assert_eq!(digital_readout(&t(7, 4, 9, 0), &ClockZone::Local), "07:04:09  (Local)");
        let tokyo = ClockZone::resolve("Asia/Tokyo");
        assert_eq!(digital_readout(&t(23, 59, 59, 999), &tokyo), "23:59:59  Asia/Tokyo");
    }
}
