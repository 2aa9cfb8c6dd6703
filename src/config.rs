use std::{path::PathBuf, sync::LazyLock};

use featurecollection::{EncodeMode, encoder::DEFAULT_QUEUE_CAPACITY};

pub const MODE_VAR: &str = "WOF_FC_MODE";
pub const OUT_VAR: &str = "WOF_FC_OUT";
pub const QUEUE_VAR: &str = "WOF_FC_QUEUE";

#[derive(Debug, Clone, PartialEq)]
pub struct FcConfig {
    mode: EncodeMode,
    out: Option<PathBuf>,
    queue: usize,
}

impl Default for FcConfig {
    fn default() -> Self {
        Self {
            mode: EncodeMode::Raw,
            out: None,
            queue: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl FcConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut config = Self::default();

        if let Some(mode) = lookup(MODE_VAR).filter(|v| !v.trim().is_empty()) {
            config.mode = mode
                .parse()
                .map_err(|e| anyhow::anyhow!("{}: {}", MODE_VAR, e))?;
        }

        if let Some(out) = lookup(OUT_VAR).filter(|v| !v.trim().is_empty()) {
            config.out = Some(std::path::absolute(out.trim())?);
        }

        if let Some(queue) = lookup(QUEUE_VAR).filter(|v| !v.trim().is_empty()) {
            let queue: usize = queue
                .trim()
                .parse()
                .map_err(|e| anyhow::anyhow!("{}: {}", QUEUE_VAR, e))?;
            if queue == 0 {
                return Err(anyhow::anyhow!("{} must be greater than 0", QUEUE_VAR));
            }
            config.queue = queue;
        }

        Ok(config)
    }

    pub fn mode(&self) -> EncodeMode {
        self.mode
    }

    /// `None` means stdout.
    pub fn out(&self) -> Option<&PathBuf> {
        self.out.as_ref()
    }

    pub fn queue(&self) -> usize {
        self.queue
    }
}

/// Process-wide config, read from the environment on first use.
pub fn config() -> anyhow::Result<&'static FcConfig> {
    static CONFIG: LazyLock<Result<FcConfig, String>> =
        LazyLock::new(|| FcConfig::from_env().map_err(|e| format!("{:#}", e)));
    CONFIG.as_ref().map_err(|e| anyhow::anyhow!("{}", e))
}
