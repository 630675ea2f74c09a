//! 统一错误类型定义.
//!
//! 所有 esprobe crate 共用的错误类型, 支持跨模块传播.
//!
//! 错误分类与码流解析的失败模式一一对应:
//! - [`ProbeError::InvalidData`]: 语法元素超出规范或实现限定的取值范围
//! - [`ProbeError::Unsupported`]: 合法但本实现不支持的语法 (如 HEVC 4:2:2, 隔行内容)
//! - [`ProbeError::Truncated`]: 码流被截断, 读取越过了缓冲区末尾

use thiserror::Error;

/// esprobe 统一错误类型
#[derive(Debug, Error)]
pub enum ProbeError {
    /// 无效参数
    #[error("无效参数: {0}")]
    InvalidArgument(String),

    /// 无效数据 (取值越界、损坏的码流等)
    #[error("无效数据: {0}")]
    InvalidData(String),

    /// 合法但不支持的语法
    #[error("不支持的特性: {0}")]
    Unsupported(String),

    /// 码流截断 (读取越界)
    #[error("码流截断: {0}")]
    Truncated(String),

    /// I/O 错误
    #[error("I/O 错误: {0}")]
    Io(#[from] std::io::Error),

    /// 已到达流末尾
    #[error("已到达流末尾")]
    Eof,
}

impl ProbeError {
    /// 是否为截断类错误
    pub fn is_truncated(&self) -> bool {
        matches!(self, Self::Truncated(_) | Self::Eof)
    }
}

/// esprobe 统一 Result 类型
pub type ProbeResult<T> = Result<T, ProbeError>;
