use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use candle_nn::VarBuilder;
use memmap2::Mmap;
use safetensors::SafeTensors;
use serde::Deserialize;
use tracing::debug;

use crate::Runtime;

pub const SAFETENSORS_FILE: &str = "model.safetensors";
pub const SAFETENSORS_INDEX_FILE: &str = "model.safetensors.index.json";
pub const PTH_FILE: &str = "pytorch_model.bin";
pub const PTH_INDEX_FILE: &str = "pytorch_model.bin.index.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WeightFiles {
    Safetensors(Vec<PathBuf>),
    Pth(Vec<PathBuf>),
}

#[derive(Debug, Deserialize)]
struct ShardIndex {
    weight_map: HashMap<String, String>,
}

/// Locates the weight files of a model directory.
///
/// Lookup order: `model.safetensors`, the safetensors shard index, any
/// `*.safetensors`, `pytorch_model.bin`, then the pytorch shard index.
pub fn find_weights(model_dir: &Path) -> Result<WeightFiles> {
    let single = model_dir.join(SAFETENSORS_FILE);
    if single.exists() {
        return Ok(WeightFiles::Safetensors(vec![single]));
    }

    if model_dir.join(SAFETENSORS_INDEX_FILE).exists() {
        return shards_from_index(model_dir, SAFETENSORS_INDEX_FILE).map(WeightFiles::Safetensors);
    }

    let mut found = vec![];
    for entry in std::fs::read_dir(model_dir).with_context(|| format!("read_dir {model_dir:?}"))? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) == Some("safetensors") {
            found.push(path);
        }
    }
    if !found.is_empty() {
        found.sort();
        return Ok(WeightFiles::Safetensors(found));
    }

    let pth = model_dir.join(PTH_FILE);
    if pth.exists() {
        return Ok(WeightFiles::Pth(vec![pth]));
    }

    if model_dir.join(PTH_INDEX_FILE).exists() {
        return shards_from_index(model_dir, PTH_INDEX_FILE).map(WeightFiles::Pth);
    }

    bail!(
        "no weights found under {model_dir:?} (expected {SAFETENSORS_FILE}, {SAFETENSORS_INDEX_FILE}, {PTH_FILE} or {PTH_INDEX_FILE})"
    )
}

/// Resolves the distinct shard files named by an index's `weight_map`.
fn shards_from_index(model_dir: &Path, index_file: &str) -> Result<Vec<PathBuf>> {
    let index = model_dir.join(index_file);
    let bytes = std::fs::read(&index).with_context(|| format!("read {index:?}"))?;
    let index: ShardIndex =
        serde_json::from_slice(&bytes).with_context(|| format!("parse {index:?}"))?;
    let names: BTreeSet<&str> = index.weight_map.values().map(String::as_str).collect();
    if names.is_empty() {
        bail!("{index_file} lists no shards");
    }
    let mut shards = Vec::with_capacity(names.len());
    for name in names {
        let path = model_dir.join(name);
        if !path.exists() {
            bail!("shard {name} listed in {index_file} is missing");
        }
        shards.push(path);
    }
    Ok(shards)
}

/// Parses the safetensors header so a truncated or corrupt shard is reported
/// by file name. Returns the number of tensors.
pub fn inspect_safetensors(path: &Path) -> Result<usize> {
    let f = std::fs::File::open(path).with_context(|| format!("open {path:?}"))?;
    let mmap = unsafe { Mmap::map(&f).with_context(|| format!("mmap {path:?}"))? };
    let st = SafeTensors::deserialize(&mmap).with_context(|| format!("deserialize {path:?}"))?;
    Ok(st.names().len())
}

pub fn var_builder(files: &WeightFiles, rt: &Runtime) -> Result<VarBuilder<'static>> {
    match files {
        WeightFiles::Safetensors(paths) => {
            let mut tensors = 0;
            for path in paths {
                tensors += inspect_safetensors(path)?;
            }
            debug!(shards = paths.len(), tensors, "safetensors headers ok");
            let vb = unsafe { VarBuilder::from_mmaped_safetensors(paths, rt.dtype, &rt.device) }
                .context("mmap safetensors into var builder")?;
            Ok(vb)
        }
        WeightFiles::Pth(paths) => match paths.as_slice() {
            [path] => {
                debug!(?path, "loading pytorch weights");
                VarBuilder::from_pth(path, rt.dtype, &rt.device)
                    .with_context(|| format!("load {path:?}"))
            }
            shards => {
                // pickled shards cannot share one backend; merge them eagerly
                let mut tensors = HashMap::new();
                for path in shards {
                    let shard = candle_core::pickle::read_all(path)
                        .with_context(|| format!("load {path:?}"))?;
                    tensors.extend(shard);
                }
                debug!(shards = shards.len(), tensors = tensors.len(), "pytorch shards loaded");
                Ok(VarBuilder::from_tensors(tensors, rt.dtype, &rt.device))
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_weights_is_error() {
        let dir = tempdir().expect("tempdir");
        let err = find_weights(dir.path()).expect_err("should fail");
        let msg = format!("{err:#}");
        assert!(msg.contains("no weights found"));
    }

    #[test]
    fn single_file_wins_over_other_shards() {
        let dir = tempdir().expect("tempdir");
        std::fs::write(dir.path().join("model.safetensors"), b"").expect("write single");
        std::fs::write(dir.path().join("extra.safetensors"), b"").expect("write extra");
        let files = find_weights(dir.path()).expect("found");
        assert_eq!(
            files,
            WeightFiles::Safetensors(vec![dir.path().join("model.safetensors")])
        );
    }

    #[test]
    fn index_lists_distinct_shards_in_order() {
        let dir = tempdir().expect("tempdir");
        for name in ["model-00001-of-00002.safetensors", "model-00002-of-00002.safetensors"] {
            std::fs::write(dir.path().join(name), b"").expect("write shard");
        }
        std::fs::write(
            dir.path().join(SAFETENSORS_INDEX_FILE),
            r#"{"metadata": {}, "weight_map": {
                "a.weight": "model-00002-of-00002.safetensors",
                "b.weight": "model-00001-of-00002.safetensors",
                "c.weight": "model-00002-of-00002.safetensors"
            }}"#,
        )
        .expect("write index");
        let files = find_weights(dir.path()).expect("found");
        assert_eq!(
            files,
            WeightFiles::Safetensors(vec![
                dir.path().join("model-00001-of-00002.safetensors"),
                dir.path().join("model-00002-of-00002.safetensors"),
            ])
        );
    }

    #[test]
    fn index_with_missing_shard_is_error() {
        let dir = tempdir().expect("tempdir");
        std::fs::write(
            dir.path().join(SAFETENSORS_INDEX_FILE),
            r#"{"weight_map": {"a.weight": "model-00001-of-00002.safetensors"}}"#,
        )
        .expect("write index");
        let err = find_weights(dir.path()).expect_err("should fail");
        assert!(format!("{err:#}").contains("model-00001-of-00002.safetensors"));
    }

    #[test]
    fn loose_safetensors_are_sorted() {
        let dir = tempdir().expect("tempdir");
        std::fs::write(dir.path().join("b.safetensors"), b"").expect("write b");
        std::fs::write(dir.path().join("a.safetensors"), b"").expect("write a");
        let files = find_weights(dir.path()).expect("found");
        assert_eq!(
            files,
            WeightFiles::Safetensors(vec![
                dir.path().join("a.safetensors"),
                dir.path().join("b.safetensors"),
            ])
        );
    }

    #[test]
    fn single_pytorch_bin_is_found() {
        let dir = tempdir().expect("tempdir");
        std::fs::write(dir.path().join(PTH_FILE), b"").expect("write bin");
        let files = find_weights(dir.path()).expect("found");
        assert_eq!(files, WeightFiles::Pth(vec![dir.path().join(PTH_FILE)]));
    }

    #[test]
    fn pytorch_index_lists_distinct_shards_in_order() {
        let dir = tempdir().expect("tempdir");
        for name in ["pytorch_model-00001-of-00002.bin", "pytorch_model-00002-of-00002.bin"] {
            std::fs::write(dir.path().join(name), b"").expect("write shard");
        }
        std::fs::write(
            dir.path().join(PTH_INDEX_FILE),
            r#"{"metadata": {"total_size": 16}, "weight_map": {
                "lm_head.weight": "pytorch_model-00002-of-00002.bin",
                "embed.weight": "pytorch_model-00001-of-00002.bin"
            }}"#,
        )
        .expect("write index");
        let files = find_weights(dir.path()).expect("found");
        assert_eq!(
            files,
            WeightFiles::Pth(vec![
                dir.path().join("pytorch_model-00001-of-00002.bin"),
                dir.path().join("pytorch_model-00002-of-00002.bin"),
            ])
        );
    }

    #[test]
    fn pytorch_index_with_missing_shard_names_the_index() {
        let dir = tempdir().expect("tempdir");
        std::fs::write(
            dir.path().join(PTH_INDEX_FILE),
            r#"{"weight_map": {"a.weight": "pytorch_model-00001-of-00002.bin"}}"#,
        )
        .expect("write index");
        let msg = format!("{:#}", find_weights(dir.path()).expect_err("should fail"));
        assert!(msg.contains("pytorch_model-00001-of-00002.bin"), "{msg}");
        assert!(msg.contains(PTH_INDEX_FILE), "{msg}");
    }

    #[test]
    fn corrupt_shard_names_the_file() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("model.safetensors");
        std::fs::write(&path, b"definitely not safetensors").expect("write");
        let err = inspect_safetensors(&path).expect_err("should fail");
        assert!(format!("{err:#}").contains("model.safetensors"));
    }
}
