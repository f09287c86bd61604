use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use zip::ZipArchive;

use super::local;
use crate::bibliography::BibliographyRecord;
use crate::config::Settings;
use crate::data::model::DataPackage;

/// Written after a successful extraction; holds the URL the tree came from.
const MARKER: &str = ".echemdb-archive";

/// Directory below the cache holding the extracted archive.
const TREE: &str = "archive";

/// The data packages below `relative` in the website archive.
pub fn collect_datapackages(relative: &str, settings: &Settings) -> Result<Vec<DataPackage>> {
    let root = ensure_archive(settings)?;
    local::collect_datapackages(&root.join(relative))
}

/// The bibliography records below `relative` in the website archive.
pub fn collect_bibliography(relative: &str, settings: &Settings) -> Result<Vec<BibliographyRecord>> {
    let root = ensure_archive(settings)?;
    local::collect_bibliography(&root.join(relative))
}

/// Download and extract the website archive once; later calls reuse the tree.
///
/// A tree extracted from another URL is replaced as a whole, never merged.
pub fn ensure_archive(settings: &Settings) -> Result<PathBuf> {
    let cache = &settings.cache_dir;
    let tree = cache.join(TREE);
    let marker = cache.join(MARKER);
    if tree.is_dir() && fs::read_to_string(&marker).is_ok_and(|url| url.trim() == settings.remote_url)
    {
        log::debug!("Using cached archive in {}", tree.display());
        return Ok(tree);
    }

    fs::create_dir_all(cache)
        .with_context(|| format!("creating cache directory {}", cache.display()))?;
    let archive = cache.join("archive.zip");
    let staging = cache.join(format!("{TREE}.partial"));
    remove_dir_if_present(&staging)?;

    log::info!("Downloading {}", settings.remote_url);
    download_to_path(&settings.remote_url, &archive)?;
    extract_archive(&archive, &staging)?;
    fs::remove_file(&archive)
        .with_context(|| format!("removing {}", archive.display()))?;

    if marker.exists() {
        fs::remove_file(&marker).with_context(|| format!("removing {}", marker.display()))?;
    }
    remove_dir_if_present(&tree)?;
    fs::rename(&staging, &tree)
        .with_context(|| format!("moving {} to {}", staging.display(), tree.display()))?;
    fs::write(&marker, &settings.remote_url)
        .with_context(|| format!("writing {}", marker.display()))?;

    Ok(tree)
}

fn remove_dir_if_present(dir: &Path) -> Result<()> {
    if dir.exists() {
        fs::remove_dir_all(dir).with_context(|| format!("removing {}", dir.display()))?;
    }
    Ok(())
}

/// Perform a simple HTTP GET and stream the response into `dest`.
fn download_to_path(url: &str, dest: &Path) -> Result<()> {
    let response = match ureq::get(url).call() {
        Ok(response) => response,
        Err(ureq::Error::Status(code, _)) => bail!("failed to download {url}: HTTP {code}"),
        Err(e) => return Err(e).with_context(|| format!("requesting {url}")),
    };
    let mut reader = response.into_reader();
    let mut file = File::create(dest)
        .with_context(|| format!("creating download target {}", dest.display()))?;
    io::copy(&mut reader, &mut file)
        .with_context(|| format!("writing archive to {}", dest.display()))?;
    Ok(())
}

/// Extract each entry from a zip archive into `out_dir`.
pub(crate) fn extract_archive(zip_path: &Path, out_dir: &Path) -> Result<()> {
    let file =
        File::open(zip_path).with_context(|| format!("opening archive {}", zip_path.display()))?;
    let mut archive = ZipArchive::new(file)
        .with_context(|| format!("reading zip archive {}", zip_path.display()))?;
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let Some(name) = entry.enclosed_name().map(Path::to_path_buf) else {
            log::warn!("Skipping archive entry with unsafe path: {}", entry.name());
            continue;
        };
        let target = out_dir.join(name);
        if entry.is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut outfile = File::create(&target)?;
            io::copy(&mut entry, &mut outfile)?;
        }
    }
    log::debug!("Extracted {} into {}", zip_path.display(), out_dir.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;

    use super::*;
    use tempfile::tempdir;
    use zip::write::FileOptions;
    use zip::ZipWriter;

    const PACKAGES: &str = "website-gh-pages/data/generated/svgdigitizer";
    const BIBLIOGRAPHY: &str = "website-gh-pages/data/generated";

    /// (sample directory, directory in the archive, file name)
    type ArchiveFile = (&'static str, &'static str, &'static str);

    const ALVES: [ArchiveFile; 3] = [
        ("alves_2011_electrochemistry_6010", "svgdigitizer/alves", "alves_2011_electrochemistry_6010_f1a_solid.json"),
        ("alves_2011_electrochemistry_6010", "svgdigitizer/alves", "alves_2011_electrochemistry_6010_f1a_solid.csv"),
        ("alves_2011_electrochemistry_6010", "bibliography", "alves_2011_electrochemistry_6010.bib"),
    ];

    const ENGSTFELD: [ArchiveFile; 2] = [
        ("engstfeld_2018_polycrystalline_17743", "svgdigitizer/engstfeld", "engstfeld_2018_polycrystalline_17743_f4b_1.json"),
        ("engstfeld_2018_polycrystalline_17743", "svgdigitizer/engstfeld", "engstfeld_2018_polycrystalline_17743_f4b_1.csv"),
    ];

    fn sample_file(sample: &str, name: &str) -> Vec<u8> {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("data/examples")
            .join(sample)
            .join(name);
        fs::read(path).unwrap()
    }

    fn write_archive(path: &Path, files: &[ArchiveFile]) {
        let mut zip = ZipWriter::new(File::create(path).unwrap());
        for (sample, dir, name) in files {
            zip.start_file(format!("{BIBLIOGRAPHY}/{dir}/{name}"), FileOptions::default())
                .unwrap();
            zip.write_all(&sample_file(sample, name)).unwrap();
        }
        zip.finish().unwrap();
    }

    /// Answer a single HTTP request with `status` and `body` and return the
    /// URL to ask.
    fn serve_once(status: &'static str, body: Vec<u8>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/archive.zip", listener.local_addr().unwrap());
        thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut buf).unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            write!(
                stream,
                "HTTP/1.1 {status}\r\nContent-Type: application/zip\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            )
            .unwrap();
            stream.write_all(&body).unwrap();
        });
        url
    }

    fn names(packages: &[DataPackage]) -> Vec<&str> {
        packages.iter().map(|p| p.name()).collect()
    }

    #[test]
    fn test_extract_and_collect() {
        let dir = tempdir().unwrap();
        let archive = dir.path().join("archive.zip");
        write_archive(&archive, &ALVES);
        extract_archive(&archive, &dir.path().join(TREE)).unwrap();

        let settings = Settings {
            remote_url: "http://127.0.0.1:9/never-requested.zip".to_string(),
            cache_dir: dir.path().to_path_buf(),
        };
        fs::write(dir.path().join(MARKER), &settings.remote_url).unwrap();

        let packages = collect_datapackages(PACKAGES, &settings).unwrap();
        assert_eq!(names(&packages), ["alves_2011_electrochemistry_6010_f1a_solid"]);

        let records = collect_bibliography(BIBLIOGRAPHY, &settings).unwrap();
        assert_eq!(records[0].key, "alves_2011_electrochemistry_6010");
    }

    #[test]
    fn test_stale_marker_downloads_again() {
        let dir = tempdir().unwrap();
        let settings = Settings {
            remote_url: "http://127.0.0.1:9/never-served.zip".to_string(),
            cache_dir: dir.path().to_path_buf(),
        };
        fs::write(dir.path().join(MARKER), "https://example.org/other.zip").unwrap();
        let err = ensure_archive(&settings).unwrap_err();
        assert!(format!("{err:#}").contains("requesting http://127.0.0.1:9/never-served.zip"));
    }

    #[test]
    fn test_new_url_replaces_cached_tree() {
        let dir = tempdir().unwrap();
        let cache = dir.path().join("cache");

        let old = dir.path().join("old.zip");
        write_archive(&old, &ALVES);
        extract_archive(&old, &cache.join(TREE)).unwrap();
        fs::write(cache.join(MARKER), "http://old.example/archive.zip").unwrap();

        let new = dir.path().join("new.zip");
        write_archive(&new, &ENGSTFELD);
        let settings = Settings {
            remote_url: serve_once("200 OK", fs::read(&new).unwrap()),
            cache_dir: cache.clone(),
        };

        let packages = collect_datapackages(PACKAGES, &settings).unwrap();
        assert_eq!(names(&packages), ["engstfeld_2018_polycrystalline_17743_f4b_1"]);
        assert!(collect_bibliography(BIBLIOGRAPHY, &settings).unwrap().is_empty());
        assert_eq!(fs::read_to_string(cache.join(MARKER)).unwrap(), settings.remote_url);
        assert!(!cache.join("archive.partial").exists());
        assert!(!cache.join("archive.zip").exists());

        // The server answered once; the second collection reads the cache.
        let again = collect_datapackages(PACKAGES, &settings).unwrap();
        assert_eq!(names(&again), ["engstfeld_2018_polycrystalline_17743_f4b_1"]);
    }

    #[test]
    fn test_http_error_keeps_status() {
        let dir = tempdir().unwrap();
        let settings = Settings {
            remote_url: serve_once("404 Not Found", Vec::new()),
            cache_dir: dir.path().to_path_buf(),
        };
        let err = ensure_archive(&settings).unwrap_err();
        assert!(err.to_string().ends_with("HTTP 404"));
        assert!(!dir.path().join(MARKER).exists());
    }
}
