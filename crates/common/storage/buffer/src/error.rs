// Copyright 2026 Ferry Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::path::PathBuf;

use snafu::Snafu;

/// Durable buffer operation errors.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum BufferError {
    /// Payload file write failed during put.
    #[snafu(display("Failed to write payload {}", path.display()))]
    WritePayload {
        path:   PathBuf,
        source: std::io::Error,
        #[snafu(implicit)]
        loc:    snafu::Location,
    },

    /// Manifest snapshot write failed during flush.
    #[snafu(display("Failed to write manifest {}", path.display()))]
    WriteManifest {
        path:   PathBuf,
        source: std::io::Error,
        #[snafu(implicit)]
        loc:    snafu::Location,
    },

    /// Queue snapshot could not be serialized.
    #[snafu(display("Failed to encode manifest"))]
    EncodeManifest {
        source: serde_json::Error,
        #[snafu(implicit)]
        loc:    snafu::Location,
    },

    /// A deferred blocking file task was cancelled or panicked.
    #[snafu(display("Deferred file task failed"))]
    Defer {
        source: tokio::task::JoinError,
        #[snafu(implicit)]
        loc:    snafu::Location,
    },
}

/// Result type for buffer operations.
pub type Result<T> = std::result::Result<T, BufferError>;
