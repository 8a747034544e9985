//! Per-service detection result

use serde::{Deserialize, Serialize};

use super::Service;

/// Which services a request concerns
///
/// Always carries one flag per service; "nothing detected" is all `false`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServiceDetection {
    pub mail: bool,
    pub calendar: bool,
    pub tasks: bool,
    pub notes: bool,
}

impl ServiceDetection {
    /// All services undetected
    pub fn none() -> Self {
        Self::default()
    }

    /// Get the flag for a service
    pub fn get(&self, service: Service) -> bool {
        match service {
            Service::Mail => self.mail,
            Service::Calendar => self.calendar,
            Service::Tasks => self.tasks,
            Service::Notes => self.notes,
        }
    }

    /// Mark a service as detected. Flags are never cleared.
    pub fn mark(&mut self, service: Service) {
        match service {
            Service::Mail => self.mail = true,
            Service::Calendar => self.calendar = true,
            Service::Tasks => self.tasks = true,
            Service::Notes => self.notes = true,
        }
    }

    /// Union of two results
    pub fn merge(mut self, other: ServiceDetection) -> Self {
        for service in Service::ALL {
            if other.get(service) {
                self.mark(service);
            }
        }
        self
    }

    /// Services flagged as detected, in fixed order
    pub fn detected(&self) -> Vec<Service> {
        Service::ALL
            .into_iter()
            .filter(|s| self.get(*s))
            .collect()
    }

    /// Whether any service was detected
    pub fn any(&self) -> bool {
        Service::ALL.into_iter().any(|s| self.get(s))
    }

    /// Iterate over (service, flag) pairs in fixed order
    pub fn iter(&self) -> impl Iterator<Item = (Service, bool)> + '_ {
        Service::ALL.into_iter().map(move |s| (s, self.get(s)))
    }
}

impl std::fmt::Display for ServiceDetection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self
            .iter()
            .map(|(service, flag)| format!("{}: {}", service, flag))
            .collect();
        write!(f, "{{{}}}", parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_all_keys() {
        let value = serde_json::to_value(ServiceDetection::none()).unwrap();
        let obj = value.as_object().unwrap();
        assert_eq!(obj.len(), 4);
        for service in Service::ALL {
            assert_eq!(obj.get(service.as_str()), Some(&serde_json::Value::Bool(false)));
        }
    }

    #[test]
    fn test_mark_and_merge() {
        let mut a = ServiceDetection::none();
        a.mark(Service::Mail);
        let mut b = ServiceDetection::none();
        b.mark(Service::Notes);

        let merged = a.merge(b);
        assert_eq!(merged.detected(), vec![Service::Mail, Service::Notes]);
        assert!(merged.any());
        assert!(!ServiceDetection::none().any());
    }

    #[test]
    fn test_display() {
        let mut detection = ServiceDetection::none();
        detection.mark(Service::Calendar);
        assert_eq!(
            detection.to_string(),
            "{mail: false, calendar: true, tasks: false, notes: false}"
        );
    }
}
