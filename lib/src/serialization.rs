//! Serialization of fitted parameters.
//!
//! Fitted transformers and classifiers expose their learned state as plain
//! parameter structs (`Vec<f64>`, scalars, enums). This module turns those
//! structs into bytes and back, independent of how the in-memory model stores
//! its arrays.

use std::error::Error;
use std::path::Path;

/// A parameter representation that can be serialized to and from bytes.
///
/// Implementors should contain only plain data, never `ndarray` views or
/// other borrowed state.
pub trait SerializableParams: Sized {
    /// The error type returned during (de)serialization.
    type Error: Error + Send + Sync + 'static;

    /// Serialize the parameters into a byte buffer.
    fn to_bytes(&self) -> Result<Vec<u8>, Self::Error>;

    /// Deserialize the parameters from a byte buffer.
    fn from_bytes(bytes: &[u8]) -> Result<Self, Self::Error>;
}

impl<T> SerializableParams for T
where
    T: serde::Serialize + for<'de> serde::Deserialize<'de>,
{
    type Error = bincode::Error;

    fn to_bytes(&self) -> Result<Vec<u8>, Self::Error> {
        bincode::serialize(self)
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, Self::Error> {
        bincode::deserialize(bytes)
    }
}

/// Write serialized parameters to `path`, replacing any existing file.
pub fn write_params<T: SerializableParams, P: AsRef<Path>>(
    params: &T,
    path: P,
) -> std::io::Result<()> {
    let bytes = params.to_bytes().map_err(std::io::Error::other)?;
    std::fs::write(path, bytes)
}

/// Read parameters previously written with [`write_params`].
pub fn read_params<T: SerializableParams, P: AsRef<Path>>(path: P) -> std::io::Result<T> {
    let bytes = std::fs::read(path)?;
    T::from_bytes(&bytes).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Toy {
        weights: Vec<f64>,
        label: String,
    }

    #[test]
    fn test_write_then_read_params() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("toy.bin");
        let toy = Toy {
            weights: vec![0.5, -1.25],
            label: "pass".to_string(),
        };

        write_params(&toy, &path).unwrap();
        let loaded: Toy = read_params(&path).unwrap();
        assert_eq!(loaded, toy);
    }

    #[test]
    fn test_read_params_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.bin");
        std::fs::write(&path, [0xff, 0xff, 0xff, 0xff]).unwrap();

        let result: std::io::Result<Toy> = read_params(&path);
        assert_eq!(result.unwrap_err().kind(), std::io::ErrorKind::InvalidData);
    }
}
