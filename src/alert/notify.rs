//! Notification selection and delivery.
//!
//! At most one notification per evaluation: the highest-severity non-empty
//! zone wins (dangerous > moderate > safe). Delivery goes through the
//! `Notifier` trait; a failing backend is logged and otherwise ignored.

use serde::{Deserialize, Serialize};

use crate::config::{NotificationSettings, ZoneRadii};
use crate::logging::{self, Component};
use crate::model::{NotifyError, ZoneLists};

/// Zone severity, ascending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneLevel {
    Safe,
    Moderate,
    Dangerous,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub level: ZoneLevel,
    pub title: String,
    pub message: String,
    pub timeout_secs: u32,
    /// Plants that triggered it, in zone order.
    pub plants: Vec<String>,
}

/// Builds the single notification for `zones`, or `None` when every zone
/// is empty. `on_site` names are appended to the message.
pub fn select_notification(
    zones: &ZoneLists,
    on_site: &[String],
    radii: &ZoneRadii,
    settings: &NotificationSettings,
) -> Option<Notification> {
    let (level, plants) = if !zones.dangerous.is_empty() {
        (ZoneLevel::Dangerous, &zones.dangerous)
    } else if !zones.moderate.is_empty() {
        (ZoneLevel::Moderate, &zones.moderate)
    } else if !zones.safe.is_empty() {
        (ZoneLevel::Safe, &zones.safe)
    } else {
        return None;
    };

    let names = plants.join(", ");
    let (title, mut message, timeout_secs) = match level {
        ZoneLevel::Dangerous => (
            "HIGH RADIATION ALERT!",
            format!(
                "Critical danger! You're within {}km of {} dangerous plants: {}",
                radii.dangerous_zone_km,
                plants.len(),
                names
            ),
            settings.dangerous_timeout_secs,
        ),
        ZoneLevel::Moderate => (
            "Moderate Radiation Warning",
            format!(
                "Caution! You're within {}km of {} aging plants: {}",
                radii.moderate_zone_km,
                plants.len(),
                names
            ),
            settings.moderate_timeout_secs,
        ),
        ZoneLevel::Safe => (
            "Radiation Monitoring",
            format!("You're near {} newer plants: {}", plants.len(), names),
            settings.safe_timeout_secs,
        ),
    };

    if !on_site.is_empty() {
        message.push_str(&format!(" (on site at: {})", on_site.join(", ")));
    }

    Some(Notification {
        level,
        title: title.to_string(),
        message,
        timeout_secs,
        plants: plants.clone(),
    })
}

// ---------------------------------------------------------------------------
// Delivery backends
// ---------------------------------------------------------------------------

pub trait Notifier: Send + Sync {
    fn notify(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Writes the notification to the service log. Used when no desktop
/// session is available (servers, containers, tests).
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        let line = format!("{}: {}", notification.title, notification.message);
        match notification.level {
            ZoneLevel::Dangerous => logging::error(Component::Notify, None, &line),
            ZoneLevel::Moderate => logging::warn(Component::Notify, None, &line),
            ZoneLevel::Safe => logging::info(Component::Notify, None, &line),
        }
        Ok(())
    }
}

/// OS toast via the desktop notification daemon.
#[cfg(feature = "desktop-notifications")]
#[derive(Debug, Default)]
pub struct DesktopNotifier;

#[cfg(feature = "desktop-notifications")]
impl Notifier for DesktopNotifier {
    fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        notify_rust::Notification::new()
            .summary(&notification.title)
            .body(&notification.message)
            .timeout(notification.timeout_secs.saturating_mul(1000) as i32)
            .show()
            .map(|_| ())
            .map_err(|e| NotifyError(e.to_string()))
    }
}

/// Picks the desktop backend when built with `desktop-notifications`,
/// otherwise the log backend.
pub fn default_notifier() -> Box<dyn Notifier> {
    #[cfg(feature = "desktop-notifications")]
    {
        Box::new(DesktopNotifier)
    }
    #[cfg(not(feature = "desktop-notifications"))]
    {
        Box::new(LogNotifier)
    }
}

/// Best-effort delivery. Returns whether the backend accepted it.
pub fn dispatch(notifier: &dyn Notifier, notification: &Notification) -> bool {
    match notifier.notify(notification) {
        Ok(()) => true,
        Err(e) => {
            logging::warn(Component::Notify, None, &e.to_string());
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zones(safe: &[&str], moderate: &[&str], dangerous: &[&str]) -> ZoneLists {
        let own = |v: &[&str]| v.iter().map(|s| s.to_string()).collect();
        ZoneLists { safe: own(safe), moderate: own(moderate), dangerous: own(dangerous) }
    }

    fn select(z: &ZoneLists) -> Option<Notification> {
        select_notification(z, &[], &ZoneRadii::default(), &NotificationSettings::default())
    }

    #[test]
    fn test_all_empty_suppresses_notification() {
        assert!(select(&ZoneLists::default()).is_none());
    }

    #[test]
    fn test_dangerous_wins_over_moderate() {
        let n = select(&zones(&[], &["Mid"], &["Old"])).expect("should notify");
        assert_eq!(n.level, ZoneLevel::Dangerous);
        assert_eq!(n.plants, vec!["Old"]);
        assert!(!n.message.contains("Mid"), "only the dangerous zone notifies");
        assert_eq!(n.timeout_secs, 15);
    }

    #[test]
    fn test_moderate_wins_over_safe() {
        let n = select(&zones(&["New"], &["Mid"], &[])).unwrap();
        assert_eq!(n.level, ZoneLevel::Moderate);
        assert_eq!(n.timeout_secs, 10);
        assert_eq!(n.message, "Caution! You're within 75km of 1 aging plants: Mid");
    }

    #[test]
    fn test_safe_only() {
        let n = select(&zones(&["A", "B"], &[], &[])).unwrap();
        assert_eq!(n.level, ZoneLevel::Safe);
        assert_eq!(n.title, "Radiation Monitoring");
        assert_eq!(n.message, "You're near 2 newer plants: A, B");
        assert_eq!(n.timeout_secs, 5);
    }

    #[test]
    fn test_dangerous_message_uses_configured_radius() {
        let radii = ZoneRadii { dangerous_zone_km: 30.0, ..ZoneRadii::default() };
        let n = select_notification(
            &zones(&[], &[], &["Old"]),
            &[],
            &radii,
            &NotificationSettings::default(),
        )
        .unwrap();
        assert_eq!(n.message, "Critical danger! You're within 30km of 1 dangerous plants: Old");
    }

    #[test]
    fn test_on_site_annotation() {
        let n = select_notification(
            &zones(&[], &[], &["Old"]),
            &["Old".to_string()],
            &ZoneRadii::default(),
            &NotificationSettings::default(),
        )
        .unwrap();
        assert!(n.message.ends_with("(on site at: Old)"), "got {}", n.message);
    }

    struct Broken;

    impl Notifier for Broken {
        fn notify(&self, _: &Notification) -> Result<(), NotifyError> {
            Err(NotifyError("no notification daemon".into()))
        }
    }

    #[test]
    fn test_dispatch_failure_is_non_fatal() {
        let n = select(&zones(&["A"], &[], &[])).unwrap();
        assert!(!dispatch(&Broken, &n));
        assert!(dispatch(&LogNotifier, &n));
    }
}
