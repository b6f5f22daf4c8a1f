use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServerRole {
    Standalone,
    Master,
    Replica,
    Sentinel,
}

impl ServerRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServerRole::Standalone => "standalone",
            ServerRole::Master => "master",
            ServerRole::Replica => "replica",
            ServerRole::Sentinel => "sentinel",
        }
    }

    pub fn is_sentinel(&self) -> bool {
        matches!(self, ServerRole::Sentinel)
    }
}

impl fmt::Display for ServerRole {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
