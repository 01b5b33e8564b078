//! Utility functions for URL and path manipulation

use std::path::Path;

/// Derive a local file name from the last path segment of a URL
///
/// The query string and fragment are discarded. Percent escapes are kept as
/// they appear in the URL, so `My%20Show.mp4` stays `My%20Show.mp4`. Relative
/// references (`clip.mp4?token=1`, `media/clip.mp4`) are accepted as well as
/// absolute URLs. Returns `None` when the final segment is empty or is a dot
/// segment.
///
/// # Examples
///
/// ```
/// use vodcast_dl::utils::file_name_from_url;
///
/// assert_eq!(
///     file_name_from_url("http://media.example/ep/TV-5801.h264.mp4?should_be_removed"),
///     Some("TV-5801.h264.mp4".to_string())
/// );
/// assert_eq!(file_name_from_url("http://media.example/"), None);
/// ```
#[must_use]
pub fn file_name_from_url(url: &str) -> Option<String> {
    let last_segment = match url::Url::parse(url) {
        Ok(parsed) => parsed
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .map(str::to_string),
        Err(_) => {
            // Relative reference: strip query and fragment by hand
            let path = url.split(['?', '#']).next().unwrap_or("");
            path.rsplit('/').next().map(str::to_string)
        }
    }?;

    if last_segment.is_empty()
        || last_segment == "."
        || last_segment == ".."
        || last_segment.contains(['/', '\\'])
    {
        return None;
    }
    Some(last_segment)
}

/// Render a byte count with binary units, e.g. `1.5 MiB`
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

/// Free bytes available to unprivileged writers on the filesystem holding `path`
///
/// statvfs on unix, GetDiskFreeSpaceExW on Windows; other platforms report
/// `ErrorKind::Unsupported`.
pub fn get_available_space(path: &Path) -> std::io::Result<u64> {
    #[cfg(unix)]
    {
        use std::ffi::CString;
        use std::os::unix::ffi::OsStrExt;

        let c_path = CString::new(path.as_os_str().as_bytes())
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;

        // SAFETY: c_path is NUL-terminated and stat is only read after statvfs succeeds
        unsafe {
            let mut stat: libc::statvfs = std::mem::zeroed();
            if libc::statvfs(c_path.as_ptr(), &mut stat) != 0 {
                return Err(std::io::Error::last_os_error());
            }

            // f_frsize is the unit f_bavail is counted in
            #[allow(clippy::unnecessary_cast)]
            let available = (stat.f_bavail as u64).saturating_mul(stat.f_frsize as u64);
            Ok(available)
        }
    }

    #[cfg(windows)]
    {
        use std::os::windows::ffi::OsStrExt;
        use winapi::um::fileapi::GetDiskFreeSpaceExW;

        let wide_path: Vec<u16> = path
            .as_os_str()
            .encode_wide()
            .chain(std::iter::once(0))
            .collect();

        let mut available: u64 = 0;
        // SAFETY: wide_path is NUL-terminated; the total counters are optional and passed as null
        let ok = unsafe {
            GetDiskFreeSpaceExW(
                wide_path.as_ptr(),
                &mut available as *mut u64 as *mut _,
                std::ptr::null_mut(),
                std::ptr::null_mut(),
            )
        };
        if ok == 0 {
            return Err(std::io::Error::last_os_error());
        }
        Ok(available)
    }

    #[cfg(not(any(unix, windows)))]
    {
        let _ = path;
        Err(std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            "free space query not available here",
        ))
    }
}
