//! 定义了库中所有可能的错误类型。
//! Defines all possible error types in the library.

use crate::table::TableShape;
use thiserror::Error;

/// The primary error type for the decision engine.
/// 决策引擎的主要错误类型。
///
/// None of these are fatal to a connection: the engine logs them and falls
/// back to a zero-initialized table or drops the save.
#[derive(Debug, Error)]
pub enum Error {
    /// An underlying I/O error occurred while reading or writing a table.
    /// 读写Q表时发生了底层的I/O错误。
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The persisted blob does not start with the table magic.
    /// 持久化数据不是以表魔数开头。
    #[error("persisted table has an invalid magic")]
    BadMagic,

    /// The persisted blob was written by an unknown encoder version.
    /// 持久化数据由未知的编码器版本写入。
    #[error("unsupported table encoding version {0}")]
    UnsupportedVersion(u8),

    /// The persisted blob ended before all cells could be read.
    /// 持久化数据在读取完所有单元之前就结束了。
    #[error("persisted table is truncated: expected {expected} bytes, found {found}")]
    TruncatedTable { expected: usize, found: usize },

    /// A shape with a zero dimension was requested or decoded.
    /// 请求或解码出了包含零维度的形状。
    #[error("invalid table shape {0:?}")]
    InvalidShape(TableShape),

    /// The persisted table does not match the configured profile.
    /// 持久化的表与配置的策略不匹配。
    #[error("table shape mismatch: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        expected: TableShape,
        found: TableShape,
    },
}

/// A specialized `Result` type for this library.
/// 本库专用的 `Result` 类型。
pub type Result<T> = std::result::Result<T, Error>;
