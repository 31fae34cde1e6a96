//! Pure decision functions kept free of any `kube` I/O so they can be
//! exercised directly in tests.

use codeloom_types::JobStatus;

/// Maps a workload's observed replica counts to a [`JobStatus`].
pub fn status_from_replicas(ready: i32, unavailable: i32, replicas: i32) -> JobStatus {
    if ready >= 1 {
        JobStatus::Running
    } else if unavailable > 0 {
        JobStatus::Failed
    } else if replicas == 0 {
        JobStatus::Suspended
    } else {
        JobStatus::Pending
    }
}

/// Picks the externally reachable address from a load balancer's
/// ingress points, preferring an IP over a hostname. Returns the
/// `"pending"` sentinel when no address has been assigned yet.
pub fn service_url_from_ingress(ingress: &[(Option<String>, Option<String>)], port: u16) -> String {
    for (ip, hostname) in ingress {
        if let Some(ip) = ip.as_deref().filter(|s| !s.is_empty()) {
            return format!("http://{ip}:{port}");
        }
        if let Some(host) = hostname.as_deref().filter(|s| !s.is_empty()) {
            return format!("http://{host}:{port}");
        }
    }
    "pending".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_ready_replica_is_running_regardless_of_others() {
        assert_eq!(status_from_replicas(1, 1, 3), JobStatus::Running);
    }

    #[test]
    fn unavailable_with_no_ready_is_failed() {
        assert_eq!(status_from_replicas(0, 2, 2), JobStatus::Failed);
    }

    #[test]
    fn zero_replicas_is_suspended() {
        assert_eq!(status_from_replicas(0, 0, 0), JobStatus::Suspended);
    }

    #[test]
    fn scaling_up_with_none_ready_yet_is_pending() {
        assert_eq!(status_from_replicas(0, 0, 1), JobStatus::Pending);
    }

    #[test]
    fn prefers_ip_over_hostname() {
        let ingress = vec![(Some("10.0.0.1".to_string()), Some("lb.example.com".to_string()))];
        assert_eq!(service_url_from_ingress(&ingress, 8080), "http://10.0.0.1:8080");
    }

    #[test]
    fn falls_back_to_hostname_when_ip_absent() {
        let ingress = vec![(None, Some("lb.example.com".to_string()))];
        assert_eq!(service_url_from_ingress(&ingress, 8080), "http://lb.example.com:8080");
    }

    #[test]
    fn reports_pending_sentinel_when_unassigned() {
        assert_eq!(service_url_from_ingress(&[], 8080), "pending");
        assert_eq!(service_url_from_ingress(&[(None, None)], 8080), "pending");
    }
}
