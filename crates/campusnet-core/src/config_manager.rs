//! 설정 파일 관리.
//!
//! 플랫폼별 설정 디렉토리에 JSON 파일로 설정을 저장/로드한다.

use crate::config::{AppConfig, CredentialsConfig};
use crate::error::CoreError;
use directories::ProjectDirs;
use parking_lot::RwLock;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 설정 파일 이름
const CONFIG_FILE_NAME: &str = "config.json";

/// 앱 디렉토리 이름
const APP_DIR_NAME: &str = "campusnet";

/// 설정 관리자
///
/// 설정 파일의 로드/저장 및 런타임 설정 변경을 관리한다.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    /// 현재 설정 (스레드 안전)
    config: Arc<RwLock<AppConfig>>,
    /// 설정 파일 경로
    config_path: PathBuf,
}

impl ConfigManager {
    /// 플랫폼 기본 경로로 설정 관리자 생성
    ///
    /// 설정 파일이 없으면 기본 설정을 생성하고 저장한다.
    pub fn new() -> Result<Self, CoreError> {
        let config_path = Self::default_config_path()?;
        Self::with_path(config_path)
    }

    /// 지정된 경로로 설정 관리자 생성
    pub fn with_path(config_path: PathBuf) -> Result<Self, CoreError> {
        if let Some(parent) = config_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| {
                    CoreError::Config(format!(
                        "설정 디렉토리 생성 실패: {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
                info!("설정 디렉토리 생성: {}", parent.display());
            }
        }

        let config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            let default_config = AppConfig::default_config();
            Self::save_to_file(&config_path, &default_config)?;
            info!("기본 설정 파일 생성: {}", config_path.display());
            default_config
        };

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            config_path,
        })
    }

    /// 현재 설정 반환 (복제본)
    pub fn get(&self) -> AppConfig {
        self.config.read().clone()
    }

    /// 설정 업데이트 및 파일 저장
    pub fn update(&self, new_config: AppConfig) -> Result<(), CoreError> {
        Self::save_to_file(&self.config_path, &new_config)?;
        *self.config.write() = new_config;
        debug!("설정 저장 완료: {}", self.config_path.display());
        Ok(())
    }

    /// 특정 필드만 업데이트
    pub fn update_with<F>(&self, updater: F) -> Result<AppConfig, CoreError>
    where
        F: FnOnce(&mut AppConfig),
    {
        let mut config = self.get();
        updater(&mut config);
        self.update(config.clone())?;
        Ok(config)
    }

    /// 자격 증명 저장
    ///
    /// 계정, 암호화 비밀번호, 네트워크 파라미터가 비어 있으면 저장하지 않는다.
    pub fn save_credentials(&self, credentials: CredentialsConfig) -> Result<(), CoreError> {
        credentials.to_credentials()?;
        let account = credentials.user_account.clone();
        self.update_with(|c| c.credentials = credentials)?;
        info!("자격 증명 저장 완료: {account}");
        Ok(())
    }

    /// 설정 파일 삭제 후 기본값으로 초기화 (파일은 다음 저장 시 다시 생성)
    pub fn reset(&self) -> Result<(), CoreError> {
        if self.config_path.exists() {
            fs::remove_file(&self.config_path).map_err(|e| {
                CoreError::Config(format!(
                    "설정 파일 삭제 실패: {}: {}",
                    self.config_path.display(),
                    e
                ))
            })?;
            info!("설정 파일 삭제: {}", self.config_path.display());
        }
        *self.config.write() = AppConfig::default_config();
        Ok(())
    }

    /// 설정 파일 경로 반환
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// 플랫폼별 기본 설정 파일 경로
    fn default_config_path() -> Result<PathBuf, CoreError> {
        let config_dir = Self::config_dir()?;
        Ok(config_dir.join(CONFIG_FILE_NAME))
    }

    /// 플랫폼별 설정 디렉토리 경로
    ///
    /// - Linux: `~/.config/campusnet`
    /// - macOS: `~/Library/Application Support/campusnet`
    /// - Windows: `%APPDATA%\campusnet\config`
    fn config_dir() -> Result<PathBuf, CoreError> {
        ProjectDirs::from("", "", APP_DIR_NAME)
            .map(|dirs| dirs.config_dir().to_path_buf())
            .ok_or_else(|| CoreError::Config("홈 디렉토리를 찾을 수 없습니다".to_string()))
    }

    /// 파일에서 설정 로드
    fn load_from_file(path: &Path) -> Result<AppConfig, CoreError> {
        let content = fs::read_to_string(path).map_err(|e| {
            CoreError::Config(format!("설정 파일 읽기 실패: {}: {}", path.display(), e))
        })?;

        let config: AppConfig = serde_json::from_str(&content).map_err(|e| {
            CoreError::Config(format!("설정 파일 파싱 실패: {}: {}", path.display(), e))
        })?;

        if let Err(e) = config.validate() {
            warn!("설정값 검증 실패 (계속 진행): {e}");
        }

        debug!("설정 파일 로드 완료: {}", path.display());
        Ok(config)
    }

    /// 파일에 설정 저장
    fn save_to_file(path: &Path, config: &AppConfig) -> Result<(), CoreError> {
        let content = serde_json::to_string_pretty(config)
            .map_err(|e| CoreError::Config(format!("설정 직렬화 실패: {}", e)))?;

        fs::write(path, content).map_err(|e| {
            CoreError::Config(format!("설정 파일 저장 실패: {}: {}", path.display(), e))
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::credentials::ServiceProvider;
    use assert_matches::assert_matches;
    use tempfile::TempDir;

    fn credentials() -> CredentialsConfig {
        CredentialsConfig {
            user_account: "stu123".to_string(),
            encrypted_password: "enc".to_string(),
            service: ServiceProvider::Cmcc,
            network_params: "wlanuserip=10.0.0.5".to_string(),
            ..CredentialsConfig::default()
        }
    }

    #[test]
    fn create_and_load_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");

        let manager = ConfigManager::with_path(config_path.clone()).unwrap();
        assert!(config_path.exists());

        let config = manager.get();
        assert_eq!(config.monitor.interval_secs, 60);
        assert!(config.credentials.user_account.is_empty());
    }

    #[test]
    fn update_and_persist_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");

        let manager = ConfigManager::with_path(config_path.clone()).unwrap();
        manager
            .update_with(|c| {
                c.monitor.interval_secs = 120;
                c.gate.max_attempts = 3;
            })
            .unwrap();

        let manager2 = ConfigManager::with_path(config_path).unwrap();
        let config = manager2.get();
        assert_eq!(config.monitor.interval_secs, 120);
        assert_eq!(config.gate.max_attempts, 3);
    }

    #[test]
    fn save_credentials_validates_required_fields() {
        let temp_dir = TempDir::new().unwrap();
        let manager = ConfigManager::with_path(temp_dir.path().join("config.json")).unwrap();

        let mut incomplete = credentials();
        incomplete.encrypted_password.clear();
        assert_matches!(
            manager.save_credentials(incomplete),
            Err(CoreError::ConfigIncomplete { .. })
        );
        assert!(manager.get().credentials.user_account.is_empty());

        manager.save_credentials(credentials()).unwrap();
        assert_eq!(manager.get().credentials.user_account, "stu123");
    }

    #[test]
    fn reset_removes_file_and_restores_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");
        let manager = ConfigManager::with_path(config_path.clone()).unwrap();
        manager.save_credentials(credentials()).unwrap();

        manager.reset().unwrap();
        assert!(!config_path.exists());
        assert!(manager.get().credentials.user_account.is_empty());
    }

    #[test]
    fn default_dir_is_per_user_app_dir() {
        let dir = ConfigManager::config_dir().unwrap();
        assert!(dir.is_absolute());
        assert!(dir.to_string_lossy().contains(APP_DIR_NAME));
    }

    #[test]
    fn corrupt_file_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");
        fs::write(&config_path, "userAccount = \"stu123\"").unwrap();

        let err = ConfigManager::with_path(config_path).unwrap_err();
        assert_matches!(err, CoreError::Config(_));
    }
}
