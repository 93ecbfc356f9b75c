use std::fs;
use std::path::{Path, PathBuf};

use hunter_client::{ensure_output_dir, AtomicFileWriter, OutputKind};
use hunter_core::LeadFilters;
use hunter_logging::{hunter_error, hunter_info, hunter_warn};
use serde::{Deserialize, Serialize};

const STATE_FILENAME: &str = ".hunter_state.ron";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
struct PersistedFilters {
    segment: Option<String>,
    min_score: Option<u32>,
    provider: Option<String>,
    search: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
struct PersistedState {
    filters: PersistedFilters,
}

/// Last applied filters; empty when nothing was saved or the file is unreadable.
pub(crate) fn load_filters(state_dir: &Path) -> LeadFilters {
    let path = state_dir.join(STATE_FILENAME);
    let content = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return LeadFilters::default();
        }
        Err(err) => {
            hunter_warn!("Failed to read saved filters from {:?}: {}", path, err);
            return LeadFilters::default();
        }
    };

    let state: PersistedState = match ron::from_str(&content) {
        Ok(state) => state,
        Err(err) => {
            hunter_warn!("Failed to parse saved filters from {:?}: {}", path, err);
            return LeadFilters::default();
        }
    };

    hunter_info!("Loaded saved filters from {:?}", path);
    let saved = state.filters;
    LeadFilters {
        segment: saved.segment,
        min_score: saved.min_score,
        provider: saved.provider,
        search: saved.search,
    }
    .normalized()
}

pub(crate) fn save_filters(state_dir: &Path, filters: &LeadFilters) {
    if let Err(err) = ensure_output_dir(state_dir, OutputKind::SavedFilters) {
        hunter_error!("{}", err);
        return;
    }

    let state = PersistedState {
        filters: PersistedFilters {
            segment: filters.segment.clone(),
            min_score: filters.min_score,
            provider: filters.provider.clone(),
            search: filters.search.clone(),
        },
    };

    let pretty = ron::ser::PrettyConfig::new();
    let content = match ron::ser::to_string_pretty(&state, pretty) {
        Ok(text) => text,
        Err(err) => {
            hunter_error!("Failed to serialize filters: {}", err);
            return;
        }
    };

    let writer = AtomicFileWriter::new(PathBuf::from(state_dir), OutputKind::SavedFilters);
    if let Err(err) = writer.write(STATE_FILENAME, content.as_bytes()) {
        hunter_error!("{}", err);
    }
}
