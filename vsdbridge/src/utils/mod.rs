// SPDX-License-Identifier: MIT

pub mod log;
pub mod string;

pub use self::log::LogLevel;
pub use self::string::*;
