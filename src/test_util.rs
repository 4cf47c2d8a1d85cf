#[cfg(test)]
pub(crate) fn with_temp_base_dir<F, R>(func: F) -> R
where
    F: FnOnce(&std::path::Path) -> R,
{
    static ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|err| err.into_inner());
    let dir = tempfile::tempdir().expect("tempdir");
    let old = std::env::var(crate::paths::BASE_DIR_ENV).ok();
    // SAFETY: environment mutation is serialized by ENV_MUTEX.
    unsafe { std::env::set_var(crate::paths::BASE_DIR_ENV, dir.path()) };
    let result = func(dir.path());
    match old {
        Some(old) => unsafe { std::env::set_var(crate::paths::BASE_DIR_ENV, old) },
        None => unsafe { std::env::remove_var(crate::paths::BASE_DIR_ENV) },
    }
    result
}
