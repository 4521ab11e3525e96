// Reads the dataset file into memory once; decoding works on its lines.
use std::fs;
use std::io;
use std::path::Path;

use crate::core::error::{Error, ErrorKind};

pub fn read_dataset(path: &Path) -> Result<String, Error> {
    fs::read_to_string(path).map_err(|err| {
        let message = match err.kind() {
            io::ErrorKind::NotFound => "dataset file not found",
            io::ErrorKind::PermissionDenied => "dataset file is not readable",
            io::ErrorKind::InvalidData => "dataset file is not valid UTF-8",
            _ => "failed to read dataset file",
        };
        Error::new(ErrorKind::Io)
            .with_message(message)
            .with_path(path)
            .with_source(err)
    })
}
