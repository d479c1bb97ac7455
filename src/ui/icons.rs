pub struct Icons;

impl Icons {
    pub const ROCKET: &str = "🚀";
    pub const CHECK: &str = "✅";
    pub const CROSS: &str = "❌";
    pub const WARN: &str = "⚠️";
    pub const INFO: &str = "ℹ️";
    pub const FILE: &str = "📄";
    pub const PACKAGE: &str = "📦";
    pub const DATABASE: &str = "🗄️";
    pub const DEL: &str = "🗑️";
    pub const STATS: &str = "📊";
    /// Dense query
    pub const VECTOR: &str = "🧭";
    /// Sparse query
    pub const TEXT: &str = "🔤";
    /// Hybrid query
    pub const FUSION: &str = "🔀";
}
