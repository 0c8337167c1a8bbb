use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Pack `<out_dir>/<dir_name>/` into `<out_dir>/<dir_name>.zip` and remove the directory.
pub fn zip_data_dir(out_dir: &Path, dir_name: &str) -> Result<()> {
    let zip_name = format!("{}.zip", dir_name);
    let zip_path = out_dir.join(&zip_name);
    let tmp_path = out_dir.join(format!("{}.tmp", zip_name));
    let src_dir = out_dir.join(dir_name);

    let file = File::create(&tmp_path)
        .with_context(|| format!("failed to create {}", tmp_path.display()))?;
    let mut zip = ZipWriter::new(file);
    let result = write_zip_entries(&mut zip, &src_dir, dir_name);

    match result.and_then(|_| zip.finish().with_context(|| "failed to finalize zip")) {
        Ok(_) => {
            fs::rename(&tmp_path, &zip_path)
                .with_context(|| format!("failed to move zip to {}", zip_path.display()))?;
            fs::remove_dir_all(&src_dir)
                .with_context(|| format!("failed to remove {}", src_dir.display()))?;
            Ok(())
        }
        Err(e) => {
            let _ = fs::remove_file(&tmp_path);
            Err(e)
        }
    }
}

fn write_zip_entries(zip: &mut ZipWriter<File>, src_dir: &Path, root: &str) -> Result<()> {
    let mtime = zip::DateTime::from_date_and_time(1980, 1, 1, 0, 0, 0)
        .map_err(|e| anyhow::anyhow!("invalid zip timestamp: {:?}", e))?;
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(mtime);

    zip.add_directory(format!("{}/", root), options)
        .with_context(|| "failed to add directory entry to zip")?;

    let mut names = fs::read_dir(src_dir)
        .with_context(|| format!("failed to read {}", src_dir.display()))?
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_file())
        .filter_map(|e| e.file_name().to_str().map(|s| s.to_string()))
        .collect::<Vec<_>>();
    names.sort();

    for name in names {
        let src_path = src_dir.join(&name);
        let zip_path = format!("{}/{}", root, name);
        add_file(zip, &src_path, &zip_path, options)
            .with_context(|| format!("failed to add {} to zip", name))?;
    }
    Ok(())
}

fn add_file(
    zip: &mut ZipWriter<File>,
    src_path: &Path,
    zip_path: &str,
    options: SimpleFileOptions,
) -> Result<()> {
    let mut file =
        File::open(src_path).with_context(|| format!("failed to open {}", src_path.display()))?;
    zip.start_file(zip_path, options)?;
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        zip.write_all(&buf[..n])?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zips_and_removes_directory() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("report_data");
        fs::create_dir(&data).unwrap();
        fs::write(data.join("readqc.tsv"), "Sample\n").unwrap();
        fs::write(data.join("sources.tsv"), "Module\n").unwrap();

        zip_data_dir(dir.path(), "report_data").unwrap();

        assert!(!data.exists());
        let archive = zip::ZipArchive::new(File::open(dir.path().join("report_data.zip")).unwrap())
            .unwrap();
        let mut names: Vec<String> = archive.file_names().map(|s| s.to_string()).collect();
        names.sort();
        assert_eq!(
            names,
            vec!["report_data/", "report_data/readqc.tsv", "report_data/sources.tsv"]
        );
    }
}
