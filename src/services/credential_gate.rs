use crate::config::Config;

/// Snapshot of which live-pipeline credentials were configured at start-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CredentialGate {
    openai_api_key: bool,
    pinecone_api_key: bool,
    pinecone_index_name: bool,
}

impl CredentialGate {
    pub fn from_config(config: &Config) -> Self {
        Self {
            openai_api_key: config.openai_api_key.is_some(),
            pinecone_api_key: config.pinecone_api_key.is_some(),
            pinecone_index_name: config.pinecone_index_name.is_some(),
        }
    }

    /// True only when every credential is present. Logs the missing ones otherwise.
    pub fn check(&self) -> bool {
        let ok = self.openai_api_key && self.pinecone_api_key && self.pinecone_index_name;
        if !ok {
            tracing::warn!(
                openai_api_key = self.openai_api_key,
                pinecone_api_key = self.pinecone_api_key,
                pinecone_index_name = self.pinecone_index_name,
                "live pipeline credentials missing, answering from fallback table"
            );
        }
        ok
    }
}
