//! Host selector (§4.3): iterate hosts in order, non-blocking acquire, and
//! on a full pass without success, block for bounded time and retry.

use std::time::Duration;

use homcc_core::{Environment, HostSpec, SlotGuard, SlotPool};

/// How often the selector re-sweeps the full host list while every host's
/// slots are exhausted.
const RETRY_INTERVAL: Duration = Duration::from_millis(100);

/// A host and the slot reservation held against it.
pub struct SelectedHost {
    /// The chosen host's spec.
    pub host: HostSpec,
    /// The reserved slot; drop releases it.
    pub guard: SlotGuard,
}

/// Select and reserve a slot on the first host (in order) with room,
/// retrying the whole list until `deadline` elapses.
///
/// Returns `Ok(None)` on timeout: every host stayed saturated for the
/// whole wait. The caller should treat this the same as `Refused` and
/// fall back to local compilation.
pub async fn select_host<E: Environment>(
    env: &E,
    pool: &SlotPool,
    hosts: &[HostSpec],
    deadline: Duration,
) -> std::io::Result<Option<SelectedHost>> {
    let start = env.now();
    loop {
        for host in hosts {
            if let Some(guard) = pool.try_acquire(&host.slot_key(), host.max_slots)? {
                return Ok(Some(SelectedHost { host: host.clone(), guard }));
            }
        }

        if env.now() - start >= deadline {
            return Ok(None);
        }

        env.sleep(RETRY_INTERVAL).await;
    }
}

#[cfg(test)]
mod tests {
    use homcc_core::env::SystemEnv;
    use tempfile::tempdir;

    use super::*;

    fn host(name: &str, max_slots: u32) -> HostSpec {
        HostSpec::parse(&format!("{name}/{max_slots}")).expect("should parse")
    }

    #[tokio::test]
    async fn prefers_the_first_host_with_room() {
        let dir = tempdir().expect("tempdir");
        let pool = SlotPool::new(dir.path());
        let env = SystemEnv::new();
        let hosts = vec![host("build1", 1), host("build2", 1)];

        let selected = select_host(&env, &pool, &hosts, Duration::from_millis(50))
            .await
            .expect("io ok")
            .expect("should select a host");
        assert_eq!(selected.host.name_or_address, "build1");
    }

    #[tokio::test]
    async fn advances_to_the_next_host_when_the_first_is_full() {
        let dir = tempdir().expect("tempdir");
        let pool = SlotPool::new(dir.path());
        let env = SystemEnv::new();
        let hosts = vec![host("build1", 1), host("build2", 1)];

        let _held = pool.try_acquire(&hosts[0].slot_key(), 1).expect("io ok").expect("should acquire");

        let selected = select_host(&env, &pool, &hosts, Duration::from_millis(50))
            .await
            .expect("io ok")
            .expect("should select a host");
        assert_eq!(selected.host.name_or_address, "build2");
    }

    #[tokio::test]
    async fn times_out_when_every_host_stays_saturated() {
        let dir = tempdir().expect("tempdir");
        let pool = SlotPool::new(dir.path());
        let env = SystemEnv::new();
        let hosts = vec![host("build1", 1)];

        let _held = pool.try_acquire(&hosts[0].slot_key(), 1).expect("io ok").expect("should acquire");

        let selected = select_host(&env, &pool, &hosts, Duration::from_millis(150)).await.expect("io ok");
        assert!(selected.is_none());
    }

    #[tokio::test]
    async fn picks_up_a_slot_freed_while_waiting() {
        let dir = tempdir().expect("tempdir");
        let pool = SlotPool::new(dir.path());
        let env = SystemEnv::new();
        let hosts = vec![host("build1", 1)];

        let held = pool.try_acquire(&hosts[0].slot_key(), 1).expect("io ok").expect("should acquire");
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(120)).await;
            drop(held);
        });

        let selected = select_host(&env, &pool, &hosts, Duration::from_secs(1))
            .await
            .expect("io ok")
            .expect("should eventually select the host");
        assert_eq!(selected.host.name_or_address, "build1");
    }
}
