/// Key of the entry that empties the transcript instead of printing anything.
pub const CLEAR_COMMAND: &str = "clear";

const NODES: &str = "NAME           STATUS   ROLES           AGE   VERSION
control-plane  Ready    control-plane   2h    v1.28.4
worker-1       Ready    <none>          2h    v1.28.4
worker-2       Ready    <none>          2h    v1.28.4";

const PODS: &str = "NAME                               READY   STATUS    RESTARTS   AGE
nginx-deployment-6b7f675859-4xvqj  1/1     Running   0          45m
nginx-deployment-6b7f675859-8mzpl  1/1     Running   0          45m
nginx-deployment-6b7f675859-kx7rj  1/1     Running   0          45m";

const PODS_ALL_NAMESPACES: &str = "NAMESPACE     NAME                                       READY   STATUS    RESTARTS   AGE
kube-system   coredns-5dd5756b68-7xqjr                   1/1     Running   0          2h
kube-system   coredns-5dd5756b68-qtxbr                   1/1     Running   0          2h
kube-system   etcd-control-plane                         1/1     Running   0          2h
kube-system   kube-apiserver-control-plane               1/1     Running   0          2h
kube-system   kube-controller-manager-control-plane      1/1     Running   0          2h
kube-system   kube-proxy-8kxqm                           1/1     Running   0          2h
kube-system   kube-proxy-fvnxs                           1/1     Running   0          2h
kube-system   kube-proxy-zl7jv                           1/1     Running   0          2h
kube-system   kube-scheduler-control-plane               1/1     Running   0          2h
default       nginx-deployment-6b7f675859-4xvqj          1/1     Running   0          45m
default       nginx-deployment-6b7f675859-8mzpl          1/1     Running   0          45m
default       nginx-deployment-6b7f675859-kx7rj          1/1     Running   0          45m";

const SERVICES: &str = "NAME         TYPE        CLUSTER-IP     EXTERNAL-IP   PORT(S)   AGE
kubernetes   ClusterIP   10.96.0.1      <none>        443/TCP   2h
nginx-svc    ClusterIP   10.96.45.123   <none>        80/TCP    45m";

const NAMESPACES: &str = "NAME              STATUS   AGE
default           Active   2h
kube-node-lease   Active   2h
kube-public       Active   2h
kube-system       Active   2h";

const CLUSTER_INFO: &str = "Kubernetes control plane is running at https://10.240.0.15:6443
CoreDNS is running at https://10.240.0.15:6443/api/v1/namespaces/kube-system/services/kube-dns:dns/proxy

To further debug and diagnose cluster problems, use 'kubectl cluster-info dump'.";

const VERSION: &str = "Client Version: v1.28.4
Kustomize Version: v5.0.4-0.20230601165947-6ce0bf390ce3
Server Version: v1.28.4";

const DEPLOYMENTS: &str = "NAME               READY   UP-TO-DATE   AVAILABLE   AGE
nginx-deployment   3/3     3            3           45m";

const DESCRIBE_CONTROL_PLANE: &str = "Name:               control-plane
Roles:              control-plane
Labels:             beta.kubernetes.io/arch=amd64
                    beta.kubernetes.io/os=linux
                    kubernetes.io/arch=amd64
                    kubernetes.io/hostname=control-plane
                    kubernetes.io/os=linux
                    node-role.kubernetes.io/control-plane=
Annotations:        kubeadm.alpha.kubernetes.io/cri-socket: unix:///var/run/containerd/containerd.sock
                    node.alpha.kubernetes.io/ttl: 0
CreationTimestamp:  Thu, 12 Dec 2024 10:00:00 +0000
Conditions:
  Type             Status  Reason                   Message
  ----             ------  ------                   -------
  MemoryPressure   False   KubeletHasSufficientMemory
  DiskPressure     False   KubeletHasNoDiskPressure
  PIDPressure      False   KubeletHasSufficientPID
  Ready            True    KubeletReady             kubelet is ready
Addresses:
  InternalIP:  10.240.0.15
  Hostname:    control-plane
Capacity:
  cpu:                2
  memory:             4028340Ki
  pods:               110
Allocatable:
  cpu:                2
  memory:             3925940Ki
  pods:               110";

const LS_LONG: &str = "total 24
drwxr-xr-x 4 student student 4096 Dec 12 10:00 .
drwxr-xr-x 3 root    root    4096 Dec 12 09:55 ..
-rw-r--r-- 1 student student  220 Dec 12 09:55 .bash_logout
-rw-r--r-- 1 student student 3771 Dec 12 09:55 .bashrc
drwxr-xr-x 2 student student 4096 Dec 12 10:00 exercises
drwxr-xr-x 2 student student 4096 Dec 12 10:00 manifests
-rw-r--r-- 1 student student 1234 Dec 12 10:00 README.md";

const README: &str = "# CKAD Practice Environment

Welcome to your Kubernetes practice cluster!

## Quick Start
- Run kubectl get nodes to verify cluster is healthy
- Explore the exercises/ directory for practice scenarios
- Use manifests/ for your YAML files

## Tips
- Use kubectl explain <resource> for help
- Tab completion is enabled
- vim and nano are available

Good luck with your certification prep!";

const HELP: &str = "Available commands:
  kubectl       - Kubernetes CLI
  ls, cd, pwd   - File navigation
  cat, vim      - File viewing/editing
  clear         - Clear terminal
  exit          - Close session";

/// Declaration order matters: prefix lookups return the first key that matches.
const BUILTIN: &[(&str, &str)] = &[
    ("kubectl get nodes", NODES),
    ("kubectl get pods", PODS),
    ("kubectl get pods -A", PODS_ALL_NAMESPACES),
    ("kubectl get services", SERVICES),
    ("kubectl get namespaces", NAMESPACES),
    ("kubectl cluster-info", CLUSTER_INFO),
    ("kubectl version", VERSION),
    ("kubectl get deployments", DEPLOYMENTS),
    ("kubectl describe node control-plane", DESCRIBE_CONTROL_PLANE),
    ("whoami", "student"),
    ("pwd", "/home/student"),
    ("ls", "exercises  manifests  README.md"),
    ("ls -la", LS_LONG),
    ("cat README.md", README),
    (CLEAR_COMMAND, ""),
    ("help", HELP),
];

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ResponseEntry {
    pub key: String,
    pub output: String,
}

/// Ordered, immutable-after-construction association list of canned outputs.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct ResponseTable {
    entries: Vec<ResponseEntry>,
}

impl ResponseTable {
    pub fn builtin() -> Self {
        let mut table = Self::default();
        for (key, output) in BUILTIN {
            table.push(key, *output);
        }
        table
    }

    /// Built-in table followed by extra entries, keeping their relative order.
    pub fn with_extras<I, K, V>(extras: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut table = Self::builtin();
        for (key, output) in extras {
            table.push(key.as_ref(), output);
        }
        table
    }

    /// Appends an entry under its canonical key. Blank keys and keys already
    /// present are ignored so earlier declarations always win. Only `clear`
    /// may map to empty output.
    fn push(&mut self, key: &str, output: impl Into<String>) {
        let key = canonical_key(key);
        if key.is_empty() || self.entries.iter().any(|entry| entry.key == key) {
            return;
        }
        let output = output.into();
        if output.is_empty() && key != CLEAR_COMMAND {
            return;
        }
        self.entries.push(ResponseEntry { key, output });
    }

    pub fn entries(&self) -> &[ResponseEntry] {
        &self.entries
    }

    /// `normalized` must already be trimmed and lower-cased.
    pub fn exact(&self, normalized: &str) -> Option<&ResponseEntry> {
        self.entries.iter().find(|entry| entry.key == normalized)
    }

    /// First entry in declaration order whose key prefixes `normalized`.
    pub fn first_prefix(&self, normalized: &str) -> Option<&ResponseEntry> {
        self.entries
            .iter()
            .find(|entry| normalized.starts_with(entry.key.as_str()))
    }
}

pub fn canonical_key(raw: &str) -> String {
    raw.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::{CLEAR_COMMAND, ResponseTable};

    #[test]
    fn builtin_keys_are_lowercase_and_ordered() {
        let table = ResponseTable::builtin();
        let keys = table
            .entries()
            .iter()
            .map(|entry| entry.key.as_str())
            .collect::<Vec<_>>();

        assert_eq!(keys[0], "kubectl get nodes");
        assert_eq!(keys[1], "kubectl get pods");
        assert_eq!(keys[2], "kubectl get pods -a");
        assert_eq!(keys.last(), Some(&"help"));
        assert!(keys.iter().all(|key| *key == key.to_lowercase()));
        assert_eq!(table.exact(CLEAR_COMMAND).map(|e| e.output.as_str()), Some(""));
    }

    #[test]
    fn prefix_lookup_prefers_earlier_declaration() {
        let table = ResponseTable::builtin();
        let hit = table.first_prefix("kubectl get pods -a --watch").expect("prefix hit");
        assert_eq!(hit.key, "kubectl get pods");
    }

    #[test]
    fn extras_append_after_builtins_without_overriding() {
        let table = ResponseTable::with_extras([
            ("  Kubectl Get Events ", "No resources found in default namespace."),
            ("whoami", "root"),
            ("   ", "ignored"),
        ]);

        assert_eq!(
            table.entries().len(),
            ResponseTable::builtin().entries().len() + 1
        );
        let last = table.entries().last().expect("extra entry");
        assert_eq!(last.key, "kubectl get events");
        assert_eq!(table.exact("whoami").map(|e| e.output.as_str()), Some("student"));
    }

    #[test]
    fn extras_with_empty_output_are_skipped() {
        let table = ResponseTable::with_extras([
            ("kubectl get events", ""),
            ("kubectl top nodes", "NAME   CPU(cores)"),
        ]);

        assert!(table.exact("kubectl get events").is_none());
        assert!(table.exact("kubectl top nodes").is_some());
        assert!(
            table
                .entries()
                .iter()
                .all(|entry| entry.key == CLEAR_COMMAND || !entry.output.is_empty())
        );
    }
}
