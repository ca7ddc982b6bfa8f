use anyhow::{Result, bail};
use chrono::{DateTime, Local, TimeDelta};
use rand::Rng;
use std::fmt::{Display, Formatter};
use std::time::{Duration, Instant};
use tracing::info;

pub const KUBE_VERSION: &str = "v1.28.4";
const SESSION_HOURS: i64 = 6;
const NAME_SUFFIX_LEN: usize = 6;
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum ClusterStatus {
    Running,
    Stopped,
    Starting,
    Stopping,
    Deleting,
}

impl ClusterStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Stopped => "stopped",
            Self::Starting => "starting",
            Self::Stopping => "stopping",
            Self::Deleting => "deleting",
        }
    }

    pub fn is_transitional(self) -> bool {
        matches!(self, Self::Starting | Self::Stopping | Self::Deleting)
    }
}

impl Display for ClusterStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum ExamTrack {
    Ckad,
    Cka,
    Cks,
}

impl ExamTrack {
    pub const ALL: [Self; 3] = [Self::Ckad, Self::Cka, Self::Cks];

    pub fn name(self) -> &'static str {
        match self {
            Self::Ckad => "CKAD",
            Self::Cka => "CKA",
            Self::Cks => "CKS",
        }
    }

    pub fn full_name(self) -> &'static str {
        match self {
            Self::Ckad => "Certified Kubernetes Application Developer",
            Self::Cka => "Certified Kubernetes Administrator",
            Self::Cks => "Certified Kubernetes Security Specialist",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "ckad" | "developer" => Some(Self::Ckad),
            "cka" | "admin" | "administrator" => Some(Self::Cka),
            "cks" | "security" => Some(Self::Cks),
            _ => None,
        }
    }

    pub fn next(self) -> Self {
        let index = Self::ALL.iter().position(|track| *track == self).unwrap_or(0);
        Self::ALL[(index + 1) % Self::ALL.len()]
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum ClusterSize {
    SingleNode,
    MultiNode,
}

impl ClusterSize {
    pub fn node_count(self) -> u8 {
        match self {
            Self::SingleNode => 1,
            Self::MultiNode => 3,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::SingleNode => "Single Node",
            Self::MultiNode => "Multi-Node",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "1" | "1-node" | "single" | "single-node" => Some(Self::SingleNode),
            "3" | "3-node" | "multi" | "multi-node" => Some(Self::MultiNode),
            _ => None,
        }
    }

    pub fn toggle(self) -> Self {
        match self {
            Self::SingleNode => Self::MultiNode,
            Self::MultiNode => Self::SingleNode,
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct ClusterResources {
    pub cpu_usage: u8,
    pub memory_usage: u8,
    pub pod_count: u32,
}

impl ClusterResources {
    fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            cpu_usage: rng.gen_range(10..40),
            memory_usage: rng.gen_range(20..60),
            pod_count: rng.gen_range(3..8),
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ClusterRecord {
    pub id: String,
    pub name: String,
    pub status: ClusterStatus,
    pub track: ExamTrack,
    pub node_count: u8,
    pub created_at: DateTime<Local>,
    pub expires_at: Option<DateTime<Local>>,
    pub ip: Option<String>,
    pub kube_version: String,
    pub resources: Option<ClusterResources>,
}

impl ClusterRecord {
    pub fn is_running(&self) -> bool {
        self.status == ClusterStatus::Running
    }

    /// `None` when the cluster has no expiry.
    pub fn time_remaining(&self, now: DateTime<Local>) -> Option<String> {
        let expires_at = self.expires_at?;
        let remaining = expires_at.signed_duration_since(now);
        if remaining <= TimeDelta::zero() {
            return Some("Expired".to_string());
        }

        let total = remaining.num_seconds();
        let hours = total / 3_600;
        let minutes = (total % 3_600) / 60;
        let seconds = total % 60;
        Some(format!("{hours}h {minutes}m {seconds}s"))
    }

    fn bring_up<R: Rng + ?Sized>(&mut self, rng: &mut R, now: DateTime<Local>) {
        self.status = ClusterStatus::Running;
        self.ip = Some(random_ip(rng));
        self.resources = Some(ClusterResources::random(rng));
        self.expires_at = Some(now + TimeDelta::hours(SESSION_HOURS));
    }

    fn shut_down(&mut self) {
        self.status = ClusterStatus::Stopped;
        self.ip = None;
        self.resources = None;
        self.expires_at = None;
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum LifecycleOp {
    Start,
    Stop,
    Delete,
}

impl LifecycleOp {
    pub fn delay(self) -> Duration {
        match self {
            Self::Start => Duration::from_millis(2_000),
            Self::Stop => Duration::from_millis(1_500),
            Self::Delete => Duration::from_millis(1_000),
        }
    }

    fn transitional_status(self) -> ClusterStatus {
        match self {
            Self::Start => ClusterStatus::Starting,
            Self::Stop => ClusterStatus::Stopping,
            Self::Delete => ClusterStatus::Deleting,
        }
    }

    pub fn progress_message(self) -> &'static str {
        match self {
            Self::Start => "Starting cluster...",
            Self::Stop => "Stopping cluster...",
            Self::Delete => "Deleting cluster...",
        }
    }

    pub fn done_message(self) -> &'static str {
        match self {
            Self::Start => "Cluster started successfully!",
            Self::Stop => "Cluster stopped",
            Self::Delete => "Cluster deleted",
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
struct PendingTransition {
    cluster_id: String,
    op: LifecycleOp,
    due: Instant,
}

/// A transition that reached its final state.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct LifecycleEvent {
    pub cluster_id: String,
    pub name: String,
    pub op: LifecycleOp,
}

#[derive(Debug, Clone, Default)]
pub struct ClusterStore {
    clusters: Vec<ClusterRecord>,
    pending: Vec<PendingTransition>,
    next_id: u64,
}

impl ClusterStore {
    pub fn seeded(now: DateTime<Local>) -> Self {
        let clusters = vec![
            ClusterRecord {
                id: "cluster-1".to_string(),
                name: "ckad-practice-01".to_string(),
                status: ClusterStatus::Running,
                track: ExamTrack::Ckad,
                node_count: 3,
                created_at: now - TimeDelta::hours(2),
                expires_at: Some(now + TimeDelta::hours(4)),
                ip: Some("10.240.0.15".to_string()),
                kube_version: KUBE_VERSION.to_string(),
                resources: Some(ClusterResources {
                    cpu_usage: 34,
                    memory_usage: 52,
                    pod_count: 12,
                }),
            },
            ClusterRecord {
                id: "cluster-2".to_string(),
                name: "cka-exam-prep".to_string(),
                status: ClusterStatus::Stopped,
                track: ExamTrack::Cka,
                node_count: 1,
                created_at: now - TimeDelta::hours(24),
                expires_at: None,
                ip: None,
                kube_version: KUBE_VERSION.to_string(),
                resources: None,
            },
        ];

        Self {
            clusters,
            pending: Vec::new(),
            next_id: 3,
        }
    }

    pub fn clusters(&self) -> &[ClusterRecord] {
        &self.clusters
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    pub fn find(&self, id: &str) -> Option<&ClusterRecord> {
        self.clusters.iter().find(|cluster| cluster.id == id)
    }

    pub fn running_count(&self) -> usize {
        self.clusters.iter().filter(|cluster| cluster.is_running()).count()
    }

    /// Creates a running cluster and puts it at the front of the list.
    pub fn launch<R: Rng + ?Sized>(
        &mut self,
        track: ExamTrack,
        size: ClusterSize,
        rng: &mut R,
        now: DateTime<Local>,
    ) -> &ClusterRecord {
        let id = format!("cluster-{}", self.next_id.max(1));
        self.next_id = self.next_id.max(1) + 1;
        let suffix = (0..NAME_SUFFIX_LEN)
            .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
            .collect::<String>();

        let mut record = ClusterRecord {
            id,
            name: format!("{}-{suffix}", track.name().to_ascii_lowercase()),
            status: ClusterStatus::Stopped,
            track,
            node_count: size.node_count(),
            created_at: now,
            expires_at: None,
            ip: None,
            kube_version: KUBE_VERSION.to_string(),
            resources: None,
        };
        record.bring_up(rng, now);
        info!(cluster = %record.name, track = track.name(), "cluster launched");

        self.clusters.insert(0, record);
        &self.clusters[0]
    }

    /// Moves a cluster into the transitional status for `op`; the final state
    /// lands once `op.delay()` has passed and `complete_due` is called.
    pub fn begin(&mut self, id: &str, op: LifecycleOp, now: Instant) -> Result<&ClusterRecord> {
        let Some(index) = self.clusters.iter().position(|cluster| cluster.id == id) else {
            bail!("cluster '{id}' not found");
        };
        let cluster = &mut self.clusters[index];
        if cluster.status.is_transitional() {
            bail!("cluster '{}' is already {}", cluster.name, cluster.status);
        }
        match (op, cluster.status) {
            (LifecycleOp::Start, ClusterStatus::Running) => {
                bail!("cluster '{}' is already running", cluster.name)
            }
            (LifecycleOp::Stop, ClusterStatus::Stopped) => {
                bail!("cluster '{}' is not running", cluster.name)
            }
            _ => {}
        }

        cluster.status = op.transitional_status();
        self.pending.push(PendingTransition {
            cluster_id: id.to_string(),
            op,
            due: now + op.delay(),
        });
        info!(cluster = %cluster.name, op = ?op, "lifecycle transition started");
        Ok(&self.clusters[index])
    }

    /// Applies every transition whose deadline has passed, in scheduling order.
    pub fn complete_due<R: Rng + ?Sized>(
        &mut self,
        now: Instant,
        wall_clock: DateTime<Local>,
        rng: &mut R,
    ) -> Vec<LifecycleEvent> {
        let (due, waiting): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending)
            .into_iter()
            .partition(|pending| pending.due <= now);
        self.pending = waiting;

        let mut events = Vec::new();
        for pending in due {
            let Some(index) = self
                .clusters
                .iter()
                .position(|cluster| cluster.id == pending.cluster_id)
            else {
                continue;
            };
            let name = self.clusters[index].name.clone();
            match pending.op {
                LifecycleOp::Start => self.clusters[index].bring_up(rng, wall_clock),
                LifecycleOp::Stop => self.clusters[index].shut_down(),
                LifecycleOp::Delete => {
                    self.clusters.remove(index);
                }
            }
            info!(cluster = %name, op = ?pending.op, "lifecycle transition finished");
            events.push(LifecycleEvent {
                cluster_id: pending.cluster_id,
                name,
                op: pending.op,
            });
        }
        events
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}

fn random_ip<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!("10.240.0.{}", rng.gen_range(0..255u8))
}
