//! 属性键
//!
//! 规则和错误缓存都以属性键为索引。推荐用 [`property_keys!`](crate::property_keys)
//! 声明枚举键，由编译器检查属性名；`&'static str` 与 `String` 作为通用回退。

use std::fmt;
use std::hash::Hash;

/// 属性键
pub trait PropertyKey: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static {
    /// 属性名，用于日志和变更通知
    fn name(&self) -> &str;
}

impl PropertyKey for &'static str {
    fn name(&self) -> &str {
        self
    }
}

impl PropertyKey for String {
    fn name(&self) -> &str {
        self.as_str()
    }
}

/// 声明属性键枚举
///
/// 生成的枚举实现 `Copy`、`Hash`、`Display` 和 [`PropertyKey`]，
/// 并提供按声明顺序排列的 `ALL` 常量。
///
/// ```
/// use rule_validation::{PropertyKey, property_keys};
///
/// property_keys! {
///     pub enum ProductField {
///         Id => "Id",
///         Title => "Title",
///     }
/// }
///
/// assert_eq!(ProductField::Title.name(), "Title");
/// assert_eq!(ProductField::ALL.len(), 2);
/// ```
#[macro_export]
macro_rules! property_keys {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $($variant:ident => $label:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        $vis enum $name {
            $($variant),+
        }

        impl $name {
            /// 按声明顺序排列的全部属性
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];
        }

        impl $crate::PropertyKey for $name {
            fn name(&self) -> &str {
                match self {
                    $(Self::$variant => $label),+
                }
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str($crate::PropertyKey::name(self))
            }
        }
    };
}
