//! Custom error types

// Copyright 2026 modelcoupler contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::error::Error as StdError;
use std::fmt;

#[derive(Debug)]
pub struct Error(Box<ErrorKind>);

pub fn new(kind: ErrorKind) -> Error {
    Error(Box::new(kind))
}

#[derive(Debug)]
pub enum ErrorKind {
    /// Malformed configuration, missing `[Global]`, unknown component type, or a
    /// capability registered twice.
    ConfigError(String),
    /// A fetch was made for a capability name that no component in the group provides.
    CapabilityNotFound(String),
    /// A fetch resolved to a producer that is in the FAILURE state.
    ProducerFailed(String),
    /// A component's body returned non-zero or panicked.
    ComponentFailure(String),
    /// A capability was fetched, published, or owned by the wrong component.
    CapabilityOwnership(String),
    /// A component attempted to fetch a capability that it owns itself.
    SelfFetch(String),
    /// Unrecoverable error inside the RAB listener, or any condition that requires
    /// aborting the whole process group.
    TransportFailure(String),
    Io(std::io::Error),
    #[cfg(feature = "config")]
    Ini(ini::ini::Error),
    #[cfg(feature = "mp")]
    Json(serde_json::Error),
    #[cfg(feature = "mp")]
    Nats(std::io::Error),
}

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        &self.0
    }

    pub fn into_kind(self) -> ErrorKind {
        *self.0
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match *self.0 {
            ErrorKind::Io(ref err) => Some(err),
            #[cfg(feature = "config")]
            ErrorKind::Ini(ref err) => Some(err),
            #[cfg(feature = "mp")]
            ErrorKind::Json(ref err) => Some(err),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self.0 {
            ErrorKind::ConfigError(ref msg) => write!(f, "configuration error: {}", msg),
            ErrorKind::CapabilityNotFound(ref cap) => write!(f, "capability not found: {}", cap),
            ErrorKind::ProducerFailed(ref cap) => {
                write!(f, "producer of capability '{}' failed", cap)
            }
            ErrorKind::ComponentFailure(ref msg) => write!(f, "component failure: {}", msg),
            ErrorKind::CapabilityOwnership(ref msg) => write!(f, "capability ownership error: {}", msg),
            ErrorKind::SelfFetch(ref cap) => {
                write!(f, "component attempted to fetch its own capability: {}", cap)
            }
            ErrorKind::TransportFailure(ref msg) => write!(f, "transport failure: {}", msg),
            ErrorKind::Io(ref err) => write!(f, "I/O error: {}", err),
            #[cfg(feature = "config")]
            ErrorKind::Ini(ref err) => write!(f, "configuration file parse error: {}", err),
            #[cfg(feature = "mp")]
            ErrorKind::Json(ref err) => write!(f, "serialization error: {}", err),
            #[cfg(feature = "mp")]
            ErrorKind::Nats(ref err) => write!(f, "NATS transport error: {}", err),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Error {
        Error(Box::new(ErrorKind::Io(source)))
    }
}

#[cfg(feature = "config")]
impl From<ini::ini::Error> for Error {
    fn from(source: ini::ini::Error) -> Error {
        Error(Box::new(ErrorKind::Ini(source)))
    }
}

#[cfg(feature = "mp")]
impl From<serde_json::Error> for Error {
    fn from(source: serde_json::Error) -> Error {
        Error(Box::new(ErrorKind::Json(source)))
    }
}

#[cfg(test)]
mod tests {
    #[allow(dead_code)]
    fn assert_sync_send<T: Send + Sync>() {}
    const _: fn() = || assert_sync_send::<super::Error>();
}
