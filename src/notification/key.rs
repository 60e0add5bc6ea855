use crate::constants::DEFAULT_KEY_SEPARATOR;

/// Three-part namespace identity carried by a release message
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReleaseKey {
    pub app_id: String,
    pub cluster_name: String,
    pub namespace_name: String,
}

/// Builds and parses `appId<sep>cluster<sep>namespace` strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReleaseMessageKeyGenerator {
    separator: char,
}

impl Default for ReleaseMessageKeyGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_KEY_SEPARATOR)
    }
}

impl ReleaseMessageKeyGenerator {
    pub fn new(separator: char) -> Self {
        Self { separator }
    }

    pub fn separator(&self) -> char {
        self.separator
    }

    pub fn generate(
        &self,
        app_id: &str,
        cluster_name: &str,
        namespace_name: &str,
    ) -> String {
        let sep = self.separator;
        format!("{app_id}{sep}{cluster_name}{sep}{namespace_name}")
    }

    /// Splits `message`, dropping empty segments; `None` unless exactly three
    /// segments remain.
    pub fn parse(
        &self,
        message: &str,
    ) -> Option<ReleaseKey> {
        let mut parts = message.split(self.separator).filter(|s| !s.is_empty());

        let app_id = parts.next()?;
        let cluster_name = parts.next()?;
        let namespace_name = parts.next()?;
        if parts.next().is_some() {
            return None;
        }

        Some(ReleaseKey {
            app_id: app_id.to_string(),
            cluster_name: cluster_name.to_string(),
            namespace_name: namespace_name.to_string(),
        })
    }
}
