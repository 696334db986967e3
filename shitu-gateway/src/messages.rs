//! Fixed user-facing texts.

pub mod session {
    pub const TIMED_OUT: &str = "⏰ 识别请求已超时，请重新发送命令";

    pub fn awaiting_image(timeout_seconds: u64) -> String {
        format!("📷 请发送要识别的图片（{}秒内有效）", timeout_seconds)
    }
}

pub mod avatar {
    pub const OWN_AVATAR: &str = "📸 识别您自己的头像...";

    pub fn typed_identity(id: &str) -> String {
        format!("📸 识别QQ号 {} 的头像...", id)
    }
}

pub mod results {
    pub const NO_MATCH: &str = "🔍 未找到匹配的信息";
    pub const NO_CHARACTERS: &str = "🔍 未识别到具体角色信息";
    pub const DATA_SOURCE: &str = "💡 数据来源: AnimeTrace，仅供参考";

    pub const SERVICE_UNAVAILABLE: &str = "❌ 识别服务暂时不可用，请稍后再试";
    pub const UNSUPPORTED_FORMAT: &str = "❌ 图片格式不受支持或已损坏";
    pub const TIMED_OUT: &str = "❌ 识别超时，请稍后再试";
    pub const FETCH_FAILED: &str = "❌ 识别失败: 图片下载失败";

    pub fn more_results(total: usize, shown: usize) -> String {
        format!("共 {} 个结果，显示前{}项", total, shown)
    }
}
