//! # Back-Office Administration
//!
//! Bootstrap, login, and the reference data products point at: branches,
//! categories, brands, roles and the company profile.
//!
//! ## Deletion Guards
//! ```text
//! ┌────────────┬──────────────────────────────────────────────────────────┐
//! │ Entity     │ Refused while                                            │
//! ├────────────┼──────────────────────────────────────────────────────────┤
//! │ Branch     │ live products hold stock there                  (InUse)  │
//! │ Category   │ any product references it                       (InUse)  │
//! │ Brand      │ any product references it                       (InUse)  │
//! │ Role       │ it is a system role              (SystemRoleProtected)   │
//! │            │ users are assigned to it                        (InUse)  │
//! └────────────┴──────────────────────────────────────────────────────────┘
//! ```
//!
//! Every check and its write run in one write transaction.

use chrono::Utc;
use tracing::{info, warn};

use crate::auth::{hash_password, verify_password};
use crate::error::{ApiError, ApiResult};
use motopos_core::validation::{validate_branch_input, validate_name};
use motopos_core::{
    Branch, BranchInput, Brand, Category, Company, CompanyInput, CoreError, Role, RoleInput, User,
    ValidationError, SYSTEM_ROLES,
};
use motopos_db::{
    generate_id, BranchRepository, CompanyRepository, Database, DbError, LookupEntity,
    LookupRepository, RoleRepository, StockRepository, UserRepository,
};

/// Name given to the company profile seeded by `/init`.
pub const DEFAULT_COMPANY_NAME: &str = "Moto POS";

/// What a bootstrap run created.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitOutcome {
    pub roles_created: usize,
    pub admin_created: bool,
    pub company_created: bool,
}

impl InitOutcome {
    pub fn already_initialized(&self) -> bool {
        self.roles_created == 0 && !self.admin_created && !self.company_created
    }
}

/// Maps a UNIQUE violation on a name-like column to a validation error.
fn duplicate_as_validation(field: &str, value: &str) -> impl FnOnce(DbError) -> ApiError {
    let field = field.to_string();
    let value = value.trim().to_string();
    move |err| match err {
        DbError::UniqueViolation { .. } => ApiError::from(ValidationError::Duplicate { field, value }),
        other => ApiError::from(other),
    }
}

// =============================================================================
// Bootstrap & Login
// =============================================================================

/// Seeds system roles, the admin account and the company profile.
///
/// Safe to call repeatedly: existing rows are left as they are.
pub async fn initialize(
    db: &Database,
    admin_username: &str,
    admin_password: &str,
) -> ApiResult<InitOutcome> {
    // Hashed before the write lock is taken.
    let password_hash = hash_password(admin_password)?;
    let now = Utc::now();

    let outcome = db
        .bounded(async {
            let mut tx = db.begin_write().await?;
            let mut outcome = InitOutcome::default();
            let mut admin_role_id = None;

            for (name, description, permissions) in SYSTEM_ROLES {
                let role = match RoleRepository::find_by_name(tx.conn(), name).await? {
                    Some(role) => role,
                    None => {
                        let role = Role {
                            id: generate_id(),
                            name: name.to_string(),
                            description: Some(description.to_string()),
                            permissions: permissions.iter().map(|p| p.to_string()).collect(),
                            is_system: true,
                            created_at: now,
                            updated_at: now,
                        };
                        RoleRepository::insert(tx.conn(), &role).await?;
                        outcome.roles_created += 1;
                        role
                    }
                };
                if admin_role_id.is_none() {
                    admin_role_id = Some(role.id);
                }
            }

            if !UserRepository::exists_by_username(tx.conn(), admin_username).await? {
                let role_id = admin_role_id
                    .ok_or_else(|| ApiError::internal("No system roles are defined"))?;
                let admin = User {
                    id: generate_id(),
                    username: admin_username.to_string(),
                    email: None,
                    full_name: "Administrator".to_string(),
                    role_id,
                    branch_id: None,
                    is_active: true,
                    created_at: now,
                };
                UserRepository::insert(tx.conn(), &admin, &password_hash).await?;
                outcome.admin_created = true;
            }

            if !CompanyRepository::exists(tx.conn()).await? {
                let company = Company {
                    name: DEFAULT_COMPANY_NAME.to_string(),
                    address: None,
                    phone: None,
                    email: None,
                    tax_number: None,
                    updated_at: now,
                };
                CompanyRepository::upsert(tx.conn(), &company).await?;
                outcome.company_created = true;
            }

            tx.commit().await?;
            Ok::<_, ApiError>(outcome)
        })
        .await?;

    info!(
        roles_created = outcome.roles_created,
        admin_created = outcome.admin_created,
        company_created = outcome.company_created,
        "System initialized"
    );
    Ok(outcome)
}

/// Checks credentials. Unknown users, wrong passwords and disabled accounts
/// all fail the same way.
pub async fn authenticate(db: &Database, username: &str, password: &str) -> ApiResult<User> {
    let found = db.bounded(db.users().find_by_username(username.trim())).await?;

    match found {
        Some((user, hash)) if user.is_active && verify_password(password, &hash) => {
            info!(user_id = %user.id, username = %user.username, "Login succeeded");
            Ok(user)
        }
        _ => {
            warn!(username = %username, "Login rejected");
            Err(ApiError::unauthorized("Invalid username or password"))
        }
    }
}

/// The user behind a token, with their role.
pub async fn current_user(db: &Database, user_id: &str) -> ApiResult<(User, Role)> {
    let user = db.bounded(db.users().get(user_id)).await.map_err(|err| match err {
        DbError::NotFound { .. } => ApiError::unauthorized("Account no longer exists"),
        other => ApiError::from(other),
    })?;
    if !user.is_active {
        return Err(ApiError::unauthorized("Account is disabled"));
    }
    let role = db.bounded(db.roles().get(&user.role_id)).await?;
    Ok((user, role))
}

// =============================================================================
// Company
// =============================================================================

pub async fn get_company(db: &Database) -> ApiResult<Company> {
    db.bounded(db.company().get())
        .await?
        .ok_or_else(|| ApiError::not_found("Company", "profile"))
}

/// Creates the profile. Refused once one exists; use [`update_company`].
pub async fn create_company(db: &Database, input: CompanyInput) -> ApiResult<Company> {
    validate_name("name", &input.name)?;

    let company = db
        .bounded(async {
            let mut tx = db.begin_write().await?;
            if CompanyRepository::exists(tx.conn()).await? {
                return Err(ApiError::from(ValidationError::Duplicate {
                    field: "company".into(),
                    value: input.name.trim().to_string(),
                }));
            }
            let company = company_from(input.clone());
            CompanyRepository::upsert(tx.conn(), &company).await?;
            tx.commit().await?;
            Ok::<_, ApiError>(company)
        })
        .await?;

    info!(name = %company.name, "Company profile created");
    Ok(company)
}

pub async fn update_company(db: &Database, input: CompanyInput) -> ApiResult<Company> {
    validate_name("name", &input.name)?;

    let company = db
        .bounded(async {
            let mut tx = db.begin_write().await?;
            if !CompanyRepository::exists(tx.conn()).await? {
                return Err(ApiError::not_found("Company", "profile"));
            }
            let company = company_from(input.clone());
            CompanyRepository::upsert(tx.conn(), &company).await?;
            tx.commit().await?;
            Ok::<_, ApiError>(company)
        })
        .await?;

    info!(name = %company.name, "Company profile updated");
    Ok(company)
}

fn company_from(input: CompanyInput) -> Company {
    Company {
        name: input.name.trim().to_string(),
        address: input.address,
        phone: input.phone,
        email: input.email,
        tax_number: input.tax_number,
        updated_at: Utc::now(),
    }
}

// =============================================================================
// Branches
// =============================================================================

pub async fn list_branches(db: &Database) -> ApiResult<Vec<Branch>> {
    Ok(db.bounded(db.branches().list()).await?)
}

pub async fn create_branch(db: &Database, input: BranchInput) -> ApiResult<Branch> {
    validate_branch_input(&input)?;
    let now = Utc::now();

    let branch = Branch {
        id: generate_id(),
        code: input.code.trim().to_string(),
        name: input.name.trim().to_string(),
        address: input.address,
        phone: input.phone,
        email: input.email,
        manager_name: input.manager_name,
        manager_phone: input.manager_phone,
        operating_hours: input.operating_hours,
        stock_capacity: input.stock_capacity,
        is_active: input.is_active.unwrap_or(true),
        created_at: now,
        updated_at: now,
    };

    db.bounded(async {
        let mut tx = db.begin_write().await?;
        BranchRepository::insert(tx.conn(), &branch)
            .await
            .map_err(duplicate_as_validation("code", &branch.code))?;
        tx.commit().await?;
        Ok::<_, ApiError>(())
    })
    .await?;

    info!(id = %branch.id, code = %branch.code, "Branch created");
    Ok(branch)
}

pub async fn update_branch(db: &Database, id: &str, input: BranchInput) -> ApiResult<Branch> {
    validate_branch_input(&input)?;

    let branch = db
        .bounded(async {
            let mut tx = db.begin_write().await?;
            let mut branch = BranchRepository::load(tx.conn(), id)
                .await?
                .ok_or_else(|| ApiError::not_found("Branch", id))?;

            branch.code = input.code.trim().to_string();
            branch.name = input.name.trim().to_string();
            branch.address = input.address.clone();
            branch.phone = input.phone.clone();
            branch.email = input.email.clone();
            branch.manager_name = input.manager_name.clone();
            branch.manager_phone = input.manager_phone.clone();
            branch.operating_hours = input.operating_hours.clone();
            branch.stock_capacity = input.stock_capacity;
            if let Some(is_active) = input.is_active {
                branch.is_active = is_active;
            }
            branch.updated_at = Utc::now();

            BranchRepository::save(tx.conn(), &branch)
                .await
                .map_err(duplicate_as_validation("code", &branch.code))?;
            tx.commit().await?;
            Ok::<_, ApiError>(branch)
        })
        .await?;

    info!(id = %branch.id, code = %branch.code, "Branch updated");
    Ok(branch)
}

pub async fn toggle_branch(db: &Database, id: &str) -> ApiResult<Branch> {
    let branch = db
        .bounded(async {
            let mut tx = db.begin_write().await?;
            let mut branch = BranchRepository::load(tx.conn(), id)
                .await?
                .ok_or_else(|| ApiError::not_found("Branch", id))?;
            branch.is_active = !branch.is_active;
            branch.updated_at = Utc::now();
            BranchRepository::save(tx.conn(), &branch).await?;
            tx.commit().await?;
            Ok::<_, ApiError>(branch)
        })
        .await?;

    info!(id = %branch.id, is_active = branch.is_active, "Branch toggled");
    Ok(branch)
}

/// Deletes a branch that holds no stock of live products.
pub async fn delete_branch(db: &Database, id: &str) -> ApiResult<()> {
    db.bounded(async {
        let mut tx = db.begin_write().await?;
        if !BranchRepository::exists(tx.conn(), id).await? {
            return Err(ApiError::not_found("Branch", id));
        }
        let held = StockRepository::held_in_branch(tx.conn(), id).await?;
        if held > 0 {
            warn!(id = %id, held, "Branch delete refused");
            return Err(ApiError::from(CoreError::InUse {
                entity: "Branch".into(),
                id: id.to_string(),
                reason: format!("{} units in stock", held),
            }));
        }
        BranchRepository::delete_in(tx.conn(), id).await?;
        tx.commit().await?;
        Ok::<_, ApiError>(())
    })
    .await?;

    info!(id = %id, "Branch deleted");
    Ok(())
}

// =============================================================================
// Categories & Brands
// =============================================================================

pub async fn list_lookups<T: LookupEntity>(db: &Database) -> ApiResult<Vec<T>> {
    Ok(db.bounded(LookupRepository::<T>::new(db.pool().clone()).list()).await?)
}

pub async fn create_lookup<T: LookupEntity>(
    db: &Database,
    name: &str,
    description: Option<String>,
) -> ApiResult<T> {
    validate_name("name", name)?;
    let name = name.trim().to_string();

    let entry = db
        .bounded(async {
            let mut tx = db.begin_write().await?;
            let entry = LookupRepository::<T>::create(
                tx.conn(),
                generate_id(),
                name.clone(),
                description,
                Utc::now(),
            )
            .await
            .map_err(duplicate_as_validation("name", &name))?;
            tx.commit().await?;
            Ok::<_, ApiError>(entry)
        })
        .await?;

    info!(entity = T::ENTITY, name = %name, "Lookup entry created");
    Ok(entry)
}

/// Deletes an entry no product references, tombstoned products included.
pub async fn delete_lookup<T: LookupEntity>(db: &Database, id: &str) -> ApiResult<()> {
    db.bounded(async {
        let mut tx = db.begin_write().await?;
        if !LookupRepository::<T>::exists(tx.conn(), id).await? {
            return Err(ApiError::not_found(T::ENTITY, id));
        }
        let references = LookupRepository::<T>::reference_count(tx.conn(), id).await?;
        if references > 0 {
            warn!(entity = T::ENTITY, id = %id, references, "Lookup delete refused");
            return Err(ApiError::from(CoreError::InUse {
                entity: T::ENTITY.into(),
                id: id.to_string(),
                reason: format!("referenced by {} products", references),
            }));
        }
        LookupRepository::<T>::delete_in(tx.conn(), id).await?;
        tx.commit().await?;
        Ok::<_, ApiError>(())
    })
    .await?;

    info!(entity = T::ENTITY, id = %id, "Lookup entry deleted");
    Ok(())
}

pub async fn list_categories(db: &Database) -> ApiResult<Vec<Category>> {
    list_lookups::<Category>(db).await
}

pub async fn list_brands(db: &Database) -> ApiResult<Vec<Brand>> {
    list_lookups::<Brand>(db).await
}

// =============================================================================
// Roles
// =============================================================================

pub async fn list_roles(db: &Database) -> ApiResult<Vec<Role>> {
    Ok(db.bounded(db.roles().list()).await?)
}

fn validate_role_input(input: &RoleInput) -> Result<(), ValidationError> {
    validate_name("name", &input.name)?;
    if input.permissions.iter().any(|p| p.trim().is_empty()) {
        return Err(ValidationError::InvalidFormat {
            field: "permissions".into(),
            reason: "must not contain empty entries".into(),
        });
    }
    Ok(())
}

pub async fn create_role(db: &Database, input: RoleInput) -> ApiResult<Role> {
    validate_role_input(&input)?;
    let now = Utc::now();

    let role = Role {
        id: generate_id(),
        name: input.name.trim().to_string(),
        description: input.description,
        permissions: input.permissions,
        is_system: false,
        created_at: now,
        updated_at: now,
    };

    db.bounded(async {
        let mut tx = db.begin_write().await?;
        RoleRepository::insert(tx.conn(), &role)
            .await
            .map_err(duplicate_as_validation("name", &role.name))?;
        tx.commit().await?;
        Ok::<_, ApiError>(())
    })
    .await?;

    info!(id = %role.id, name = %role.name, "Role created");
    Ok(role)
}

/// Replaces a role's fields. System roles keep their name.
pub async fn update_role(db: &Database, id: &str, input: RoleInput) -> ApiResult<Role> {
    validate_role_input(&input)?;

    let role = db
        .bounded(async {
            let mut tx = db.begin_write().await?;
            let mut role = RoleRepository::load(tx.conn(), id)
                .await?
                .ok_or_else(|| ApiError::not_found("Role", id))?;

            let name = input.name.trim();
            if role.is_system && name != role.name {
                warn!(id = %id, name = %role.name, "System role rename refused");
                return Err(ApiError::from(CoreError::SystemRoleProtected {
                    name: role.name.clone(),
                    action: "renamed".into(),
                }));
            }

            role.name = name.to_string();
            role.description = input.description.clone();
            role.permissions = input.permissions.clone();
            role.updated_at = Utc::now();

            RoleRepository::save(tx.conn(), &role)
                .await
                .map_err(duplicate_as_validation("name", &role.name))?;
            tx.commit().await?;
            Ok::<_, ApiError>(role)
        })
        .await?;

    info!(id = %role.id, name = %role.name, "Role updated");
    Ok(role)
}

pub async fn delete_role(db: &Database, id: &str) -> ApiResult<()> {
    db.bounded(async {
        let mut tx = db.begin_write().await?;
        let role = RoleRepository::load(tx.conn(), id)
            .await?
            .ok_or_else(|| ApiError::not_found("Role", id))?;

        if role.is_system {
            warn!(id = %id, name = %role.name, "System role delete refused");
            return Err(ApiError::from(CoreError::SystemRoleProtected {
                name: role.name,
                action: "deleted".into(),
            }));
        }
        let users = RoleRepository::users_with_role(tx.conn(), id).await?;
        if users > 0 {
            return Err(ApiError::from(CoreError::InUse {
                entity: "Role".into(),
                id: id.to_string(),
                reason: format!("assigned to {} users", users),
            }));
        }

        RoleRepository::delete_in(tx.conn(), id).await?;
        tx.commit().await?;
        Ok::<_, ApiError>(())
    })
    .await?;

    info!(id = %id, "Role deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::services::catalog::tests::{input, seeded_db};
    use crate::services::catalog::ProductCatalog;
    use motopos_db::DbConfig;

    async fn initialized_db() -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        initialize(&db, "admin", "admin123").await.unwrap();
        db
    }

    #[tokio::test]
    async fn test_initialize_is_idempotent() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let first = initialize(&db, "admin", "admin123").await.unwrap();
        assert_eq!(first.roles_created, SYSTEM_ROLES.len());
        assert!(first.admin_created);
        assert!(first.company_created);

        let second = initialize(&db, "admin", "admin123").await.unwrap();
        assert!(second.already_initialized());

        let roles = list_roles(&db).await.unwrap();
        assert_eq!(roles.len(), 3);
        assert!(roles.iter().all(|r| r.is_system));
        assert_eq!(get_company(&db).await.unwrap().name, DEFAULT_COMPANY_NAME);
    }

    #[tokio::test]
    async fn test_authenticate() {
        let db = initialized_db().await;

        let user = authenticate(&db, "ADMIN", "admin123").await.unwrap();
        assert_eq!(user.username, "admin");
        let (_, role) = current_user(&db, &user.id).await.unwrap();
        assert_eq!(role.name, "Admin");

        let err = authenticate(&db, "admin", "wrong").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Unauthorized);
        let err = authenticate(&db, "ghost", "admin123").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Unauthorized);
    }

    #[tokio::test]
    async fn test_system_roles_are_protected() {
        let db = initialized_db().await;
        let roles = list_roles(&db).await.unwrap();
        let cashier = roles.iter().find(|r| r.name == "Cashier").unwrap();

        let err = delete_role(&db, &cashier.id).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::SystemRoleProtected);

        let rename = RoleInput {
            name: "Till Operator".into(),
            description: None,
            permissions: vec!["products.view".into()],
        };
        let err = update_role(&db, &cashier.id, rename).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::SystemRoleProtected);

        let edit = RoleInput {
            name: "Cashier".into(),
            description: Some("Front counter".into()),
            permissions: vec!["products.view".into()],
        };
        let updated = update_role(&db, &cashier.id, edit).await.unwrap();
        assert_eq!(updated.description.as_deref(), Some("Front counter"));
        assert_eq!(updated.permissions, vec!["products.view".to_string()]);
    }

    #[tokio::test]
    async fn test_custom_role_lifecycle() {
        let db = initialized_db().await;
        let role = create_role(
            &db,
            RoleInput {
                name: "Stock Clerk".into(),
                description: None,
                permissions: vec!["stock.manage".into()],
            },
        )
        .await
        .unwrap();
        assert!(!role.is_system);

        let err = create_role(
            &db,
            RoleInput {
                name: "stock clerk".into(),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        delete_role(&db, &role.id).await.unwrap();
        assert_eq!(
            delete_role(&db, &role.id).await.unwrap_err().code,
            ErrorCode::NotFound
        );
    }

    #[tokio::test]
    async fn test_branch_delete_refused_while_stocked() {
        let db = seeded_db().await;
        let catalog = ProductCatalog::new(db.clone());
        let product = catalog.create(input("Brake Cable")).await.unwrap();
        catalog.set_stock(&product.id, "branch-1", 3, None).await.unwrap();

        let err = delete_branch(&db, "branch-1").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InUse);

        catalog.set_stock(&product.id, "branch-1", 0, None).await.unwrap();
        delete_branch(&db, "branch-1").await.unwrap();
        assert_eq!(list_branches(&db).await.unwrap().len(), 1);

        let history = catalog
            .stock_movements(&product.id, Some("branch-1"), 10)
            .await
            .unwrap();
        assert_eq!(history.len(), 2, "history outlives the branch");
    }

    #[tokio::test]
    async fn test_branch_code_must_be_unique() {
        let db = seeded_db().await;
        let err = create_branch(
            &db,
            BranchInput {
                code: "jkt-01".into(),
                name: "Jakarta 2".into(),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert!(err.message.contains("code"));

        let branch = create_branch(
            &db,
            BranchInput {
                code: "SBY-01".into(),
                name: "Surabaya".into(),
                stock_capacity: 500,
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert!(branch.is_active);

        let toggled = toggle_branch(&db, &branch.id).await.unwrap();
        assert!(!toggled.is_active);
    }

    #[tokio::test]
    async fn test_lookup_delete_refused_while_referenced() {
        let db = seeded_db().await;
        let catalog = ProductCatalog::new(db.clone());
        catalog.create(input("Brake Fluid")).await.unwrap();

        let err = delete_lookup::<Category>(&db, "cat-1").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InUse);

        let brand: Brand = create_lookup(&db, "  Federal ", None).await.unwrap();
        assert_eq!(brand.name, "Federal");
        delete_lookup::<Brand>(&db, &brand.id).await.unwrap();
        assert_eq!(list_brands(&db).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_company_create_then_update() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert_eq!(get_company(&db).await.unwrap_err().code, ErrorCode::NotFound);

        let err = update_company(
            &db,
            CompanyInput {
                name: "Bengkel Jaya".into(),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);

        create_company(
            &db,
            CompanyInput {
                name: "Bengkel Jaya".into(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let company = update_company(
            &db,
            CompanyInput {
                name: "Bengkel Jaya Motor".into(),
                tax_number: Some("01.234.567.8-901.000".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(company.name, "Bengkel Jaya Motor");
        assert_eq!(get_company(&db).await.unwrap().tax_number, company.tax_number);
    }
}
