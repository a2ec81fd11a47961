//! # State directory
//!
//! Everything the CLI keeps between invocations:
//!
//! ```text
//! .openbridge/
//! ├── config.json          optional BridgeConfig override
//! ├── source-ledger.json   simulated source ledger snapshot
//! ├── dest-ledger.json     simulated destination ledger snapshot
//! ├── audit.jsonl          risk gate audit journal
//! └── records/             one JSON document per transfer record
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use openbridge_gate::AuditLog;
use openbridge_relay::{
    BalanceMonitor, Collaborators, EventSink, JsonFileRecordStore, Keyring, RecordStore,
    SimulatedBridge, SimulatedLedger, TracingSink, TransferOrchestrator,
};
use openbridge_types::{AccountId, BridgeConfig};
use serde::{Serialize, de::DeserializeOwned};

/// Label of the bridge's custody account.
pub const CUSTODY_LABEL: &str = "custody";

const CONFIG_FILE: &str = "config.json";
const SOURCE_LEDGER_FILE: &str = "source-ledger.json";
const DEST_LEDGER_FILE: &str = "dest-ledger.json";
const AUDIT_FILE: &str = "audit.jsonl";
const RECORDS_DIR: &str = "records";

/// Account controlled by the development key for `label`.
#[must_use]
pub fn account(label: &str) -> AccountId {
    Keyring::dev_account(label)
}

/// An opened state directory.
pub struct Workspace {
    root: PathBuf,
    pub config: BridgeConfig,
    pub ledger: Arc<SimulatedLedger>,
    pub bridge: Arc<SimulatedBridge>,
    pub store: Arc<JsonFileRecordStore>,
    pub audit: Arc<AuditLog>,
    events: Arc<dyn EventSink>,
}

impl Workspace {
    /// Open (creating if needed) the state directory at `root`.
    ///
    /// The configuration comes from `config_path`, else `root/config.json`,
    /// else the defaults with the `custody` development account.
    pub fn open(root: &Path, config_path: Option<&Path>) -> Result<Self> {
        fs::create_dir_all(root)
            .with_context(|| format!("creating state directory {}", root.display()))?;

        let config = load_config(root, config_path)?;
        let ledger = read_snapshot(&root.join(SOURCE_LEDGER_FILE))?
            .map_or_else(SimulatedLedger::new, SimulatedLedger::from_state);
        let bridge = read_snapshot(&root.join(DEST_LEDGER_FILE))?
            .map_or_else(SimulatedBridge::new, SimulatedBridge::from_state);
        let store = JsonFileRecordStore::open(&root.join(RECORDS_DIR))
            .context("opening record store")?;
        let audit = AuditLog::with_journal(&root.join(AUDIT_FILE)).context("opening audit journal")?;

        tracing::debug!(root = %root.display(), "state directory opened");
        Ok(Self {
            root: root.to_path_buf(),
            config,
            ledger: Arc::new(ledger),
            bridge: Arc::new(bridge),
            store: Arc::new(store),
            audit: Arc::new(audit),
            events: Arc::new(TracingSink),
        })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// An orchestrator able to sign for the accounts behind `labels`.
    pub fn orchestrator(&self, labels: &[&str]) -> Result<TransferOrchestrator> {
        let keyring = labels
            .iter()
            .fold(Keyring::new(), |ring, label| ring.with_key(Keyring::dev_key(label)));
        let store: Arc<dyn RecordStore> = self.store.clone();
        TransferOrchestrator::new(
            self.config.clone(),
            Collaborators {
                ledger: self.ledger.clone(),
                bridge: self.bridge.clone(),
                store,
                events: self.events.clone(),
                signer: Arc::new(keyring),
                audit: self.audit.clone(),
            },
        )
        .context("building orchestrator")
    }

    #[must_use]
    pub fn monitor(&self) -> BalanceMonitor {
        BalanceMonitor::new(
            self.config.monitor.clone(),
            &self.config.retry,
            self.config.custody_account.clone(),
            self.ledger.clone(),
            self.bridge.clone(),
            self.store.clone(),
            self.events.clone(),
        )
    }

    /// Persist both simulated ledgers.
    pub fn save(&self) -> Result<()> {
        write_snapshot(&self.root.join(SOURCE_LEDGER_FILE), &self.ledger.state())?;
        write_snapshot(&self.root.join(DEST_LEDGER_FILE), &self.bridge.state())?;
        Ok(())
    }
}

fn load_config(root: &Path, config_path: Option<&Path>) -> Result<BridgeConfig> {
    let path = config_path.map_or_else(|| root.join(CONFIG_FILE), Path::to_path_buf);
    if path.exists() {
        return BridgeConfig::from_path(&path)
            .with_context(|| format!("loading configuration {}", path.display()));
    }
    if config_path.is_some() {
        anyhow::bail!("configuration file not found: {}", path.display());
    }
    let config = BridgeConfig {
        custody_account: account(CUSTODY_LABEL),
        ..BridgeConfig::default()
    };
    config.validate()?;
    Ok(config)
}

fn read_snapshot<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let json = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let state = serde_json::from_str(&json).with_context(|| format!("parsing {}", path.display()))?;
    Ok(Some(state))
}

fn write_snapshot<T: Serialize>(path: &Path, state: &T) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, serde_json::to_vec_pretty(state)?)
        .with_context(|| format!("writing {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("replacing {}", path.display()))?;
    Ok(())
}
