use axum::{
    Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
};

use crate::{
    AppState,
    api::schema::user::{UserInfo, UserRequest},
    database::models::user::NewUser,
    error::AppError,
    utils::{hash_password_blocking, validate_user},
};

fn parse_id(path: Result<Path<i64>, PathRejection>) -> Result<i64, AppError> {
    path.map(|Path(id)| id)
        .map_err(|e| AppError::BadRequest(e.body_text()))
}

/// 校验请求体并哈希密码，得到可写入数据库的数据
async fn prepare_user(
    state: &AppState,
    body: Result<Json<UserRequest>, JsonRejection>,
) -> Result<NewUser, AppError> {
    let Json(req) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;
    validate_user(&req)?;

    let password_hash = hash_password_blocking(req.password, state.config.bcrypt_cost).await?;

    Ok(NewUser {
        name: req.name,
        email: req.email,
        password_hash,
    })
}

/// 创建用户
pub async fn create_user(
    State(state): State<AppState>,
    body: Result<Json<UserRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<UserInfo>), AppError> {
    let new_user = prepare_user(&state, body).await?;

    let ticket = state.cache.fill_ticket();
    let user = state.store.create(new_user).await?;

    // 用数据库返回的行（带自增 id）回填缓存
    let info = UserInfo::from(&user);
    state.cache.fill(user, ticket);

    tracing::info!("User created with ID: {}", info.id);
    Ok((StatusCode::CREATED, Json(info)))
}

/// 按 ID 获取用户，优先读缓存
pub async fn get_user(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<UserInfo>, AppError> {
    let id = parse_id(path)?;

    if let Some(user) = state.cache.get(id) {
        return Ok(Json(UserInfo::from(&user)));
    }

    // 查库期间发生的写入会让这次回填作废
    let ticket = state.cache.fill_ticket();
    let user = state
        .store
        .find_by_id(id)
        .await?
        .ok_or(AppError::NotFound(id))?;

    let info = UserInfo::from(&user);
    state.cache.fill(user, ticket);

    tracing::info!("User fetched with ID: {}", id);
    Ok(Json(info))
}

/// 列出所有用户，不经过缓存
pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<UserInfo>>, AppError> {
    let users = state.store.list().await?;

    Ok(Json(users.iter().map(UserInfo::from).collect()))
}

/// 更新用户
pub async fn update_user(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    body: Result<Json<UserRequest>, JsonRejection>,
) -> Result<Json<UserInfo>, AppError> {
    let id = parse_id(path)?;
    let new_user = prepare_user(&state, body).await?;

    let write = state.cache.begin_write(id);
    match state.store.update(id, new_user).await {
        Ok(Some(user)) => {
            let info = UserInfo::from(&user);
            write.stored(user);

            tracing::info!("User updated with ID: {}", id);
            Ok(Json(info))
        }
        Ok(None) => {
            // 数据库确认该行不存在，旧缓存不再有效
            write.absent();
            Err(AppError::NotFound(id))
        }
        Err(e) => {
            // 写库失败，缓存保持原样
            write.unchanged();
            Err(e.into())
        }
    }
}

/// 删除用户
pub async fn delete_user(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, AppError> {
    let id = parse_id(path)?;

    let write = state.cache.begin_write(id);
    let deleted = match state.store.delete(id).await {
        Ok(deleted) => deleted,
        Err(e) => {
            write.unchanged();
            return Err(e.into());
        }
    };
    write.absent();

    if !deleted {
        return Err(AppError::NotFound(id));
    }

    tracing::info!("User deleted with ID: {}", id);
    Ok(StatusCode::NO_CONTENT)
}
