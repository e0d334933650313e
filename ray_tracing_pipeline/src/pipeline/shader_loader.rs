//! SPIR-V shader loading
//!
//! Shader binaries are compiled offline. A [`ShaderLoader`] turns a stage's
//! file name into validated SPIR-V words; the pipeline never touches the file
//! system directly.

use std::path::{Path, PathBuf};
use rustc_hash::FxHashMap;
use crate::error::{Error, Result};
use crate::engine_error;

/// First word of every SPIR-V module
pub const SPIRV_MAGIC: u32 = 0x0723_0203;

/// Source of SPIR-V code for the pipeline's shader stages
pub trait ShaderLoader: Send + Sync {
    /// Load the module called `file_name`
    ///
    /// # Errors
    ///
    /// `Error::ShaderLoadFailed` when the module cannot be found or is not SPIR-V.
    fn load(&self, file_name: &str) -> Result<Vec<u32>>;
}

/// Decode SPIR-V bytes into words
///
/// Accepts both byte orders (a byte-swapped magic number means the module was
/// written big-endian).
pub fn spirv_words(name: &str, bytes: &[u8]) -> Result<Vec<u32>> {
    if bytes.len() % 4 != 0 {
        return Err(shader_error(name, format!("size {} is not a multiple of 4 bytes", bytes.len())));
    }
    // Magic, version, generator, bound, schema
    if bytes.len() < 20 {
        return Err(shader_error(name, format!("{} bytes is too short for a SPIR-V header", bytes.len())));
    }

    let mut words: Vec<u32> = bytes
        .chunks_exact(4)
        .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect();

    if words[0] == SPIRV_MAGIC.swap_bytes() {
        for word in &mut words {
            *word = word.swap_bytes();
        }
    } else if words[0] != SPIRV_MAGIC {
        return Err(shader_error(name, format!("bad magic number {:#010x}", words[0])));
    }

    Ok(words)
}

fn shader_error(name: &str, reason: String) -> Error {
    engine_error!("rtp::ShaderLoader", "Shader '{}': {}", name, reason);
    Error::ShaderLoadFailed(format!("{}: {}", name, reason))
}

// ===== FILE LOADER =====

/// Loads `.spv` files from a directory
#[derive(Debug, Clone)]
pub struct FileShaderLoader {
    directory: PathBuf,
}

impl FileShaderLoader {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }
}

impl ShaderLoader for FileShaderLoader {
    fn load(&self, file_name: &str) -> Result<Vec<u32>> {
        let path = self.directory.join(file_name);
        let bytes = std::fs::read(&path)
            .map_err(|e| shader_error(file_name, format!("cannot read '{}': {}", path.display(), e)))?;
        spirv_words(file_name, &bytes)
    }
}

// ===== MEMORY LOADER =====

/// Serves SPIR-V modules registered in memory (embedded with `include_bytes!`, generated, ...)
#[derive(Debug, Clone, Default)]
pub struct MemoryShaderLoader {
    modules: FxHashMap<String, Vec<u32>>,
}

impl MemoryShaderLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module from raw bytes
    pub fn insert_bytes(&mut self, file_name: impl Into<String>, bytes: &[u8]) -> Result<()> {
        let file_name = file_name.into();
        let words = spirv_words(&file_name, bytes)?;
        self.modules.insert(file_name, words);
        Ok(())
    }

    /// Register a module from words (must start with the SPIR-V magic number)
    pub fn insert_words(&mut self, file_name: impl Into<String>, words: Vec<u32>) -> Result<()> {
        let file_name = file_name.into();
        if words.first() != Some(&SPIRV_MAGIC) {
            return Err(shader_error(&file_name, "missing SPIR-V magic number".to_string()));
        }
        self.modules.insert(file_name, words);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

impl ShaderLoader for MemoryShaderLoader {
    fn load(&self, file_name: &str) -> Result<Vec<u32>> {
        self.modules
            .get(file_name)
            .cloned()
            .ok_or_else(|| shader_error(file_name, "no such module registered".to_string()))
    }
}

#[cfg(test)]
#[path = "shader_loader_tests.rs"]
mod tests;
