pub struct Icons;

impl Icons {
    pub const RUN: &str = "🚀";
    pub const COMMITTED: &str = "✅";
    pub const FAILED: &str = "❌";
    pub const CAUTION: &str = "⚠️";
    pub const NOTE: &str = "ℹ️";
    pub const STATS: &str = "📊";
    pub const SCRIPT: &str = "📜";
    pub const CONFIG: &str = "📄";
    pub const DATABASE: &str = "🗄️";
    pub const REBUILD: &str = "🏗️";
    pub const SKIP: &str = "⏭️";
    pub const RESUME: &str = "🔁";
    pub const EXPORT: &str = "📤";
}
