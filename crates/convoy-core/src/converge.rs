//! ヘルス収束ループ
//!
//! requiredなサービス全てがhealthyを報告するまで、上限付きでポーリングする。
//! 依存が揃っているのに起動しないサービスには1回だけ強制起動（nudge）を
//! 発行し、壊れたサービスを無限再起動で覆い隠さないようにする。

use crate::model::{ConvergeConfig, HealthSnapshot, HealthState, Topology};
use crate::runtime::ServiceRuntime;
use std::collections::{BTreeMap, HashSet};
use std::time::Duration;
use tokio::time::sleep;

/// 収束ループの終了結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvergeOutcome {
    /// requiredな全サービスがhealthyに到達
    Converged { attempts: u32 },
    /// 試行回数上限に到達
    TimedOut,
}

/// requiredなサービスの収束を待つ
///
/// 各試行でトポロジー内の全サービスをプローブしてスナップショットを
/// `log` に追記し、required全てがhealthyなら終了する。
/// 観測に失敗したサービスはその試行では `unknown` として記録する
/// （ランタイム再起動中などは試行回数を消費すべきで、Runを落とすべきではない）。
pub async fn converge<R: ServiceRuntime>(
    runtime: &R,
    topology: &Topology,
    config: &ConvergeConfig,
    log: &mut Vec<HealthSnapshot>,
) -> ConvergeOutcome {
    // サービスごとの強制起動は1 Runにつき最大1回
    let mut nudged: HashSet<String> = HashSet::new();

    for attempt in 1..=config.max_attempts {
        let mut per_service = BTreeMap::new();
        for spec in &topology.services {
            let state = match runtime.probe(topology, &spec.name).await {
                Ok(state) => state,
                Err(e) => {
                    tracing::debug!("プローブ失敗 ({}): {:#}", spec.name, e);
                    HealthState::Unknown
                }
            };
            per_service.insert(spec.name.clone(), state);
        }

        let snapshot = HealthSnapshot::new(log.len() as u32 + 1, per_service);

        let all_required_healthy = topology
            .required_services()
            .all(|s| snapshot.state_of(&s.name) == HealthState::Healthy);

        if all_required_healthy {
            log.push(snapshot);
            tracing::info!("収束完了（{}回目の試行）", attempt);
            return ConvergeOutcome::Converged { attempts: attempt };
        }

        // 依存が全てhealthyなのに自身がnot_runningのサービスを1回だけ起こす。
        // starting / unhealthy は対象外（起動はしているので待つだけ）。
        for spec in &topology.services {
            if nudged.contains(&spec.name) {
                continue;
            }
            if snapshot.state_of(&spec.name) != HealthState::NotRunning {
                continue;
            }
            // 依存なしのサービスは常に「依存が揃っている」とみなす
            if !spec
                .depends_on
                .iter()
                .all(|dep| snapshot.state_of(dep) == HealthState::Healthy)
            {
                continue;
            }

            nudged.insert(spec.name.clone());
            tracing::warn!(
                "サービス '{}' は依存が揃っているのに起動していないため、強制起動します",
                spec.name
            );
            if let Err(e) = runtime.start_service(topology, &spec.name).await {
                // 強制起動の失敗はポーリング継続で観測する
                tracing::warn!("強制起動に失敗しました ({}): {:#}", spec.name, e);
            }
        }

        log.push(snapshot);

        // 最後の試行でなければ待機
        if attempt < config.max_attempts {
            sleep(Duration::from_millis(config.interval_ms)).await;
        }
    }

    ConvergeOutcome::TimedOut
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ServiceSpec;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    /// 試行ごとの状態遷移をスクリプトとして与えるスタブランタイム
    struct StubRuntime {
        plan: Mutex<HashMap<String, VecDeque<HealthState>>>,
        started: Mutex<Vec<String>>,
    }

    impl StubRuntime {
        fn new(plan: &[(&str, &[HealthState])]) -> Self {
            let plan = plan
                .iter()
                .map(|(name, states)| (name.to_string(), states.iter().copied().collect()))
                .collect();
            Self {
                plan: Mutex::new(plan),
                started: Mutex::new(Vec::new()),
            }
        }

        fn started_services(&self) -> Vec<String> {
            self.started.lock().unwrap().clone()
        }
    }

    impl ServiceRuntime for StubRuntime {
        async fn build(&self, _topology: &Topology) -> anyhow::Result<()> {
            Ok(())
        }

        async fn stop(&self, _topology: &Topology) -> anyhow::Result<()> {
            Ok(())
        }

        async fn start(&self, _topology: &Topology) -> anyhow::Result<()> {
            Ok(())
        }

        async fn start_service(&self, _topology: &Topology, service: &str) -> anyhow::Result<()> {
            self.started.lock().unwrap().push(service.to_string());
            Ok(())
        }

        async fn remove(&self, _topology: &Topology) -> anyhow::Result<()> {
            Ok(())
        }

        async fn probe(&self, _topology: &Topology, service: &str) -> anyhow::Result<HealthState> {
            let mut plan = self.plan.lock().unwrap();
            let queue = plan
                .get_mut(service)
                .ok_or_else(|| anyhow::anyhow!("unplanned service: {}", service))?;
            // スクリプトを使い切ったら最後の状態を返し続ける
            let state = if queue.len() > 1 {
                queue.pop_front().unwrap()
            } else {
                *queue.front().unwrap()
            };
            Ok(state)
        }

        async fn list(&self, _topology: &Topology) -> anyhow::Result<Vec<crate::ServiceListing>> {
            Ok(Vec::new())
        }
    }

    fn topology_of(services: Vec<ServiceSpec>) -> Topology {
        let mut topology = Topology::new("testapp");
        topology.services = services;
        topology
    }

    fn fast_config(max_attempts: u32) -> ConvergeConfig {
        ConvergeConfig {
            max_attempts,
            interval_ms: 0,
        }
    }

    #[tokio::test]
    async fn test_converges_in_one_attempt_when_all_healthy() {
        let topology = topology_of(vec![ServiceSpec::new("db"), ServiceSpec::new("api")]);
        let runtime = StubRuntime::new(&[
            ("db", &[HealthState::Healthy]),
            ("api", &[HealthState::Healthy]),
        ]);

        let mut log = Vec::new();
        let outcome = converge(&runtime, &topology, &fast_config(120), &mut log).await;

        assert_eq!(outcome, ConvergeOutcome::Converged { attempts: 1 });
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].sequence_number, 1);
    }

    #[tokio::test]
    async fn test_times_out_at_exactly_attempt_budget() {
        let topology = topology_of(vec![ServiceSpec::new("api")]);
        let runtime = StubRuntime::new(&[("api", &[HealthState::Starting])]);

        let mut log = Vec::new();
        let outcome = converge(&runtime, &topology, &fast_config(120), &mut log).await;

        assert_eq!(outcome, ConvergeOutcome::TimedOut);
        // 試行ログの長さは試行回数上限と一致する
        assert_eq!(log.len(), 120);
        assert_eq!(log.last().unwrap().sequence_number, 120);
    }

    #[tokio::test]
    async fn test_nudge_fires_at_most_once_per_service() {
        let mut api = ServiceSpec::new("api");
        api.depends_on = vec!["db".to_string()];
        let topology = topology_of(vec![ServiceSpec::new("db"), api]);

        // dbは最初からhealthy、apiは永遠にnot_running
        let runtime = StubRuntime::new(&[
            ("db", &[HealthState::Healthy]),
            ("api", &[HealthState::NotRunning]),
        ]);

        let mut log = Vec::new();
        let outcome = converge(&runtime, &topology, &fast_config(30), &mut log).await;

        assert_eq!(outcome, ConvergeOutcome::TimedOut);
        // 30回ポーリングしても強制起動は1回だけ
        assert_eq!(runtime.started_services(), vec!["api".to_string()]);
    }

    #[tokio::test]
    async fn test_nudge_requires_all_dependencies_healthy() {
        let mut api = ServiceSpec::new("api");
        api.depends_on = vec!["db".to_string(), "cache".to_string()];
        let topology = topology_of(vec![
            ServiceSpec::new("db"),
            ServiceSpec::new("cache"),
            api,
        ]);

        let runtime = StubRuntime::new(&[
            ("db", &[HealthState::Healthy]),
            ("cache", &[HealthState::Starting]),
            ("api", &[HealthState::NotRunning]),
        ]);

        let mut log = Vec::new();
        converge(&runtime, &topology, &fast_config(5), &mut log).await;

        // cacheが揃っていないのでnudgeしない
        assert!(runtime.started_services().is_empty());
    }

    #[tokio::test]
    async fn test_dependency_free_service_is_nudged_once() {
        let topology = topology_of(vec![ServiceSpec::new("db")]);
        let runtime = StubRuntime::new(&[("db", &[HealthState::NotRunning])]);

        let mut log = Vec::new();
        converge(&runtime, &topology, &fast_config(5), &mut log).await;

        assert_eq!(runtime.started_services(), vec!["db".to_string()]);
    }

    #[tokio::test]
    async fn test_starting_service_is_not_nudged() {
        let mut api = ServiceSpec::new("api");
        api.depends_on = vec!["db".to_string()];
        let topology = topology_of(vec![ServiceSpec::new("db"), api]);

        let runtime = StubRuntime::new(&[
            ("db", &[HealthState::Healthy]),
            ("api", &[HealthState::Starting]),
        ]);

        let mut log = Vec::new();
        converge(&runtime, &topology, &fast_config(5), &mut log).await;

        assert!(runtime.started_services().is_empty());
    }

    #[tokio::test]
    async fn test_converges_after_several_attempts() {
        let topology = topology_of(vec![ServiceSpec::new("db"), ServiceSpec::new("api")]);
        let runtime = StubRuntime::new(&[
            ("db", &[HealthState::Healthy]),
            (
                "api",
                &[
                    HealthState::Starting,
                    HealthState::Starting,
                    HealthState::Healthy,
                ],
            ),
        ]);

        let mut log = Vec::new();
        let outcome = converge(&runtime, &topology, &fast_config(10), &mut log).await;

        assert_eq!(outcome, ConvergeOutcome::Converged { attempts: 3 });
        assert_eq!(log.len(), 3);
    }

    #[tokio::test]
    async fn test_optional_service_does_not_block_convergence() {
        let mut metrics = ServiceSpec::new("metrics");
        metrics.required_for_success = false;
        let topology = topology_of(vec![ServiceSpec::new("api"), metrics]);

        let runtime = StubRuntime::new(&[
            ("api", &[HealthState::Healthy]),
            ("metrics", &[HealthState::Unhealthy]),
        ]);

        let mut log = Vec::new();
        let outcome = converge(&runtime, &topology, &fast_config(5), &mut log).await;

        assert_eq!(outcome, ConvergeOutcome::Converged { attempts: 1 });
        // スナップショットには必須でないサービスも記録される
        assert_eq!(log[0].state_of("metrics"), HealthState::Unhealthy);
    }

    #[tokio::test]
    async fn test_probe_failure_records_unknown() {
        let topology = topology_of(vec![ServiceSpec::new("api"), ServiceSpec::new("ghost")]);
        // "ghost" はスタブに計画がないためプローブがエラーになる
        let runtime = StubRuntime::new(&[("api", &[HealthState::Healthy])]);

        let mut log = Vec::new();
        let outcome = converge(&runtime, &topology, &fast_config(2), &mut log).await;

        assert_eq!(outcome, ConvergeOutcome::TimedOut);
        assert_eq!(log[0].state_of("ghost"), HealthState::Unknown);
    }
}
