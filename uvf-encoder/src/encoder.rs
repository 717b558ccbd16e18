/// UVF encoding pipeline: segmentation, packing, manifest construction and file output.
use crate::classify::{GeometryKind, classify};
use crate::error::{EncodeError, EncodeResult};
use crate::grouping;
use crate::manifest::{BatchManifestBuilder, Manifest, MeshEntry, build_single};
use crate::mesh::SourceMesh;
use crate::options::EncodeOptions;
use crate::packer::{BufferPacker, PackedBuffer, ValueRange, scalar_ranges};
use crate::report::{EncodeReport, Operation, SkippedMesh};
use crate::segment::{SegmentedIndices, segment};
use constants::{
    BATCH_FACE_SUFFIX, BINARY_EXTENSION, ISOSURFACES_GROUP, ROOT_GROUP_ID, SLICES_GROUP,
    STREAMLINES_GROUP, SURFACES_GROUP,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const RESERVED_IDS: &[&str] = &[
    ROOT_GROUP_ID,
    SLICES_GROUP,
    SURFACES_GROUP,
    ISOSURFACES_GROUP,
    STREAMLINES_GROUP,
];

/// Encodes a single mesh into `out_dir` with default options.
pub fn encode_single(source: &SourceMesh, out_dir: &Path) -> EncodeResult<EncodeReport> {
    UvfEncoder::new(out_dir).encode_single(source)
}

/// Encodes labeled meshes into a grouped manifest under `out_dir` with default options.
pub fn encode_batch(
    labeled: Vec<(String, SourceMesh)>,
    out_dir: &Path,
) -> EncodeResult<EncodeReport> {
    UvfEncoder::new(out_dir).encode_batch(labeled)
}

/// Mesh after segmentation and packing, ready to be written and described.
struct PreparedMesh {
    segmented: SegmentedIndices,
    packed: PackedBuffer,
    ranges: BTreeMap<String, ValueRange>,
    point_count: usize,
}

impl PreparedMesh {
    fn entry<'a>(&'a self, kind: GeometryKind, binary_path: &'a str) -> MeshEntry<'a> {
        MeshEntry {
            kind,
            table: &self.packed.table,
            segments: self.segmented.segments.as_deref(),
            ranges: &self.ranges,
            binary_path,
        }
    }

    fn triangle_count(&self) -> usize {
        self.segmented.indices.len() / 3
    }
}

/// Writes UVF datasets (binary buffers plus manifest) into one output directory.
pub struct UvfEncoder {
    /// Root directory receiving the manifest and binaries.
    output_dir: PathBuf,
    options: EncodeOptions,
}

impl UvfEncoder {
    pub fn new(output_dir: &Path) -> Self {
        Self::with_options(output_dir, EncodeOptions::default())
    }

    pub fn with_options(output_dir: &Path, options: EncodeOptions) -> Self {
        Self {
            output_dir: output_dir.to_path_buf(),
            options,
        }
    }

    /// Classifies, packs and writes one mesh as `<binary_name>` plus the manifest.
    pub fn encode_single(&self, source: &SourceMesh) -> EncodeResult<EncodeReport> {
        let kind = classify(&source.mesh, source.topology, &self.options.mesh_name);
        info!(
            points = source.mesh.vertex_count(),
            triangles = source.mesh.triangle_count(),
            %kind,
            "encoding single mesh"
        );

        let prepared = self.prepare(source)?;
        create_dir(&self.output_dir)?;

        let binary_path = self.output_dir.join(&self.options.binary_name);
        write_file(&binary_path, &prepared.packed.bytes)?;

        let manifest = build_single(
            &self.options.mesh_name,
            &prepared.entry(kind, &self.options.binary_name),
        );
        let manifest_path = self.write_manifest(&manifest)?;

        let mut report = EncodeReport::new(Operation::Single, manifest_path);
        report.record_mesh(prepared.point_count, prepared.triangle_count());
        report.group_count = 1;
        report.kind = Some(kind);

        self.print_summary(&report, &manifest);
        Ok(report)
    }

    /// Groups meshes by label keywords and writes one binary per mesh plus a grouped manifest.
    ///
    /// A mesh that fails to prepare or write, or whose label is unusable as a
    /// file name, is skipped and reported; the rest of the batch still encodes.
    /// Failing to create the output directories fails the whole call.
    pub fn encode_batch(&self, labeled: Vec<(String, SourceMesh)>) -> EncodeResult<EncodeReport> {
        if labeled.is_empty() {
            return Err(EncodeError::EmptyBatch);
        }
        let total = labeled.len();
        info!(meshes = total, "encoding batch");

        let resources_dir = self.output_dir.join(&self.options.resources_dir);
        create_dir(&self.output_dir)?;
        create_dir(&resources_dir)?;

        let groups = grouping::group(labeled);
        let mut builder = BatchManifestBuilder::new();
        let mut report = EncodeReport::new(Operation::Batch, PathBuf::new());
        let mut seen = HashSet::new();

        let pb = self.progress_bar(total as u64);
        for data_group in groups.into_values() {
            debug!(
                group = data_group.group_name,
                members = data_group.members.len(),
                "encoding group"
            );

            for (label, source) in &data_group.members {
                pb.set_message(label.clone());

                if !seen.insert(label.clone()) {
                    skip(&mut report, label, "duplicate label".to_string());
                    pb.inc(1);
                    continue;
                }

                let relative = format!(
                    "{}/{}.{}",
                    self.options.resources_dir.trim_end_matches('/'),
                    label,
                    BINARY_EXTENSION
                );

                let written = check_label(label)
                    .and_then(|()| self.prepare_and_write(source, &resources_dir, label));
                match written {
                    Ok(prepared) => {
                        report.record_mesh(prepared.point_count, prepared.triangle_count());
                        builder.add_mesh(
                            data_group.group_name,
                            label,
                            &format!("{label}{BATCH_FACE_SUFFIX}"),
                            &prepared.entry(data_group.group_type, &relative),
                        );
                    }
                    Err(err) => skip(&mut report, label, err.to_string()),
                }
                pb.inc(1);
            }
        }
        pb.finish_with_message("Meshes encoded");

        if report.file_count == 0 {
            warn!("no mesh in the batch could be encoded, writing an empty manifest");
        }

        report.group_count = builder.group_count();
        let manifest = builder.finish();
        report.manifest_path = self.write_manifest(&manifest)?;

        self.print_summary(&report, &manifest);
        Ok(report)
    }

    /// Validates, segments and packs a mesh.
    fn prepare(&self, source: &SourceMesh) -> EncodeResult<PreparedMesh> {
        let mesh = &source.mesh;
        mesh.validate()?;

        let segmented = segment(&mesh.indices, source.faces.as_ref())?;
        let packed = BufferPacker::new(self.options.field_policy).pack(
            &segmented.indices,
            &mesh.vertices,
            &mesh.scalar_fields,
        )?;

        Ok(PreparedMesh {
            segmented,
            packed,
            ranges: scalar_ranges(&mesh.scalar_fields),
            point_count: mesh.vertex_count(),
        })
    }

    fn prepare_and_write(
        &self,
        source: &SourceMesh,
        resources_dir: &Path,
        label: &str,
    ) -> EncodeResult<PreparedMesh> {
        let prepared = self.prepare(source)?;
        let binary_path = resources_dir.join(format!("{label}.{BINARY_EXTENSION}"));
        write_file(&binary_path, &prepared.packed.bytes)?;
        Ok(prepared)
    }

    fn write_manifest(&self, manifest: &Manifest) -> EncodeResult<PathBuf> {
        let manifest_path = self.output_dir.join(&self.options.manifest_name);
        let json = manifest.to_json(self.options.pretty)?;
        write_file(&manifest_path, json.as_bytes())?;
        Ok(manifest_path)
    }

    fn progress_bar(&self, len: u64) -> ProgressBar {
        if !self.options.progress {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new(len);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{bar:40.green/blue}] {pos}/{len} meshes ({percent}%) {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("▉▊▋▌▍▎▏ "),
        );
        pb
    }

    /// Logs manifest summary for verification and debugging.
    fn print_summary(&self, report: &EncodeReport, manifest: &Manifest) {
        info!(
            manifest = %report.manifest_path.display(),
            nodes = manifest.len(),
            files = report.file_count,
            groups = report.group_count,
            points = report.point_count,
            triangles = report.triangle_count,
            skipped = report.skipped.len(),
            "generated manifest"
        );
    }
}

fn skip(report: &mut EncodeReport, label: &str, reason: String) {
    warn!(label, %reason, "skipping mesh");
    report.skipped.push(SkippedMesh {
        label: label.to_string(),
        reason,
    });
}

/// Labels become binary file names and node ids, so they must stay inside
/// the resources directory and clear of the reserved group ids.
fn check_label(label: &str) -> EncodeResult<()> {
    let reason = if label.is_empty() {
        "label is empty"
    } else if label.contains(['/', '\\']) || label.contains("..") {
        "label must not contain path separators or '..'"
    } else if RESERVED_IDS.contains(&label) {
        "label is a reserved group id"
    } else {
        return Ok(());
    };

    Err(EncodeError::InvalidLabel {
        label: label.to_string(),
        reason,
    })
}

fn create_dir(path: &Path) -> EncodeResult<()> {
    fs::create_dir_all(path).map_err(|e| EncodeError::io(path, e))
}

fn write_file(path: &Path, bytes: &[u8]) -> EncodeResult<()> {
    fs::write(path, bytes).map_err(|e| EncodeError::io(path, e))?;
    debug!(path = %path.display(), bytes = bytes.len(), "wrote file");
    Ok(())
}
