//! Lead Service
//!
//! Lead CRUD, bulk upload with automatic distribution, manual assignment and
//! the open → ongoing → closed status flow.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;

use super::activity_service::{record_quietly, ActivityService};
use super::{actor_for, Caller};
use crate::application::dto::request::{BulkLeadsRequest, CreateLeadRequest, UpdateLeadRequest};
use crate::domain::{
    ActivityPayload, DealClosed, Lead, LeadAssigned, LeadAssigner, LeadCreated, LeadFilter,
    LeadRepository, LeadStatus, LeadStatusChanged, LeadsUploaded, User, UserRepository,
};
use crate::shared::error::AppError;
use crate::shared::pagination::{Page, PageParams};
use crate::shared::snowflake::SnowflakeGenerator;

/// Lead service trait
#[async_trait]
pub trait LeadService: Send + Sync {
    /// Admins see every lead; employees only their own
    async fn list(
        &self,
        caller: Caller,
        filter: LeadFilter,
        page: PageParams,
    ) -> Result<Page<Lead>, LeadError>;

    async fn get(&self, caller: Caller, id: i64) -> Result<Lead, LeadError>;

    async fn create(&self, caller: Caller, input: CreateLeadRequest) -> Result<Lead, LeadError>;

    /// Insert a batch in one transaction, optionally distributing it
    async fn bulk_create(
        &self,
        caller: Caller,
        input: BulkLeadsRequest,
    ) -> Result<BulkUploadResult, LeadError>;

    async fn update(
        &self,
        caller: Caller,
        id: i64,
        input: UpdateLeadRequest,
    ) -> Result<Lead, LeadError>;

    async fn delete(&self, caller: Caller, id: i64) -> Result<(), LeadError>;

    async fn assign(&self, caller: Caller, id: i64, employee_id: i64) -> Result<Lead, LeadError>;

    async fn update_status(
        &self,
        caller: Caller,
        id: i64,
        status: LeadStatus,
    ) -> Result<Lead, LeadError>;
}

/// Outcome of a bulk upload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BulkUploadResult {
    pub inserted: u64,
    pub assigned: usize,
}

/// Lead errors
#[derive(Debug, thiserror::Error)]
pub enum LeadError {
    #[error("Lead not found")]
    NotFound,

    #[error("This lead is not assigned to you")]
    Forbidden,

    #[error("Cannot move a lead from {from} to {to}")]
    InvalidTransition { from: LeadStatus, to: LeadStatus },

    #[error("Assignee must be an active employee")]
    InvalidAssignee,

    #[error(transparent)]
    Repository(#[from] AppError),
}

impl From<LeadError> for AppError {
    fn from(err: LeadError) -> Self {
        match err {
            LeadError::NotFound => AppError::NotFound(err.to_string()),
            LeadError::Forbidden => AppError::Forbidden(err.to_string()),
            LeadError::InvalidTransition { .. } | LeadError::InvalidAssignee => {
                AppError::BadRequest(err.to_string())
            }
            LeadError::Repository(e) => e,
        }
    }
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn build_lead(id: i64, input: CreateLeadRequest) -> Lead {
    let now = Utc::now();
    Lead {
        id,
        name: input.name.trim().to_string(),
        email: clean(input.email).map(|e| e.to_lowercase()),
        phone: clean(input.phone),
        source: clean(input.source),
        status: input.status.unwrap_or_default(),
        lead_type: input.lead_type.unwrap_or_default(),
        language: clean(input.language),
        location: clean(input.location),
        assigned_to: input.assigned_to,
        received_at: input.received_at.unwrap_or(now),
        created_at: now,
        updated_at: now,
    }
}

/// LeadService implementation
pub struct LeadServiceImpl<L, U>
where
    L: LeadRepository,
    U: UserRepository,
{
    lead_repo: Arc<L>,
    user_repo: Arc<U>,
    activities: Arc<dyn ActivityService>,
    id_generator: Arc<SnowflakeGenerator>,
}

impl<L, U> LeadServiceImpl<L, U>
where
    L: LeadRepository,
    U: UserRepository,
{
    pub fn new(
        lead_repo: Arc<L>,
        user_repo: Arc<U>,
        activities: Arc<dyn ActivityService>,
        id_generator: Arc<SnowflakeGenerator>,
    ) -> Self {
        Self {
            lead_repo,
            user_repo,
            activities,
            id_generator,
        }
    }

    async fn find(&self, id: i64) -> Result<Lead, LeadError> {
        self.lead_repo
            .find_by_id(id)
            .await?
            .ok_or(LeadError::NotFound)
    }

    /// Load a user that may receive leads.
    async fn active_employee(&self, id: i64) -> Result<User, LeadError> {
        self.user_repo
            .find_by_id(id)
            .await?
            .filter(|u| !u.is_admin() && u.is_active())
            .ok_or(LeadError::InvalidAssignee)
    }

    async fn assignee_name(&self, lead: &Lead) -> Option<String> {
        let id = lead.assigned_to?;
        match self.user_repo.find_by_id(id).await {
            Ok(user) => user.map(|u| u.name),
            Err(e) => {
                tracing::warn!(user_id = id, error = %e, "Could not load assignee");
                None
            }
        }
    }
}

#[async_trait]
impl<L, U> LeadService for LeadServiceImpl<L, U>
where
    L: LeadRepository + 'static,
    U: UserRepository + 'static,
{
    async fn list(
        &self,
        caller: Caller,
        mut filter: LeadFilter,
        page: PageParams,
    ) -> Result<Page<Lead>, LeadError> {
        if !caller.is_admin() {
            filter.assigned_to = Some(caller.id);
        }
        let items = self
            .lead_repo
            .list(&filter, page.offset(), page.limit())
            .await?;
        let total = self.lead_repo.count(&filter).await?;
        Ok(Page::new(items, total, page))
    }

    async fn get(&self, caller: Caller, id: i64) -> Result<Lead, LeadError> {
        let lead = self.find(id).await?;
        if !caller.is_admin() && !lead.is_assigned_to(caller.id) {
            return Err(LeadError::Forbidden);
        }
        Ok(lead)
    }

    async fn create(&self, caller: Caller, input: CreateLeadRequest) -> Result<Lead, LeadError> {
        if let Some(assignee) = input.assigned_to {
            self.active_employee(assignee).await?;
        }

        let lead = build_lead(self.id_generator.generate(), input);
        let lead = self.lead_repo.create(&lead).await?;
        tracing::info!(lead_id = lead.id, "Lead created");

        let actor = actor_for(self.user_repo.as_ref(), &caller).await;
        let payload = ActivityPayload::LeadCreated(LeadCreated {
            lead_name: lead.name.clone(),
            created_by: actor.name.clone(),
        });
        record_quietly(self.activities.as_ref(), payload, actor).await;

        Ok(lead)
    }

    async fn bulk_create(
        &self,
        caller: Caller,
        input: BulkLeadsRequest,
    ) -> Result<BulkUploadResult, LeadError> {
        let mut leads: Vec<Lead> = input
            .leads
            .into_iter()
            .map(|row| build_lead(self.id_generator.generate(), row))
            .collect();

        let preassigned = leads.iter().any(|l| l.assigned_to.is_some());
        let mut assigned = 0;
        if input.auto_assign || preassigned {
            let employees = self.user_repo.find_active_employees().await?;
            let known = |id: i64| employees.iter().any(|e| e.id == id);
            if leads
                .iter()
                .filter_map(|l| l.assigned_to)
                .any(|id| !known(id))
            {
                return Err(LeadError::InvalidAssignee);
            }

            if input.auto_assign {
                let loads: HashMap<i64, i64> = self
                    .lead_repo
                    .active_load_by_assignee()
                    .await?
                    .into_iter()
                    .collect();
                let mut assigner = LeadAssigner::new(&employees, &loads);
                if assigner.is_empty() {
                    tracing::warn!("Auto-assign requested but no active employees");
                }
                for owner in leads.iter().filter_map(|l| l.assigned_to) {
                    assigner.record(owner);
                }
                for lead in leads.iter_mut().filter(|l| l.assigned_to.is_none()) {
                    lead.assigned_to = assigner.assign(lead);
                    if lead.assigned_to.is_some() {
                        assigned += 1;
                    }
                }
            }
        }

        let inserted = self.lead_repo.create_many(&leads).await?;
        tracing::info!(inserted, assigned, "Bulk lead upload");

        let actor = actor_for(self.user_repo.as_ref(), &caller).await;
        let payload = ActivityPayload::LeadsUploaded(LeadsUploaded {
            count: inserted,
            uploaded_by: actor.name.clone(),
        });
        record_quietly(self.activities.as_ref(), payload, actor).await;

        Ok(BulkUploadResult { inserted, assigned })
    }

    async fn update(
        &self,
        _caller: Caller,
        id: i64,
        input: UpdateLeadRequest,
    ) -> Result<Lead, LeadError> {
        let mut lead = self.find(id).await?;

        if let Some(name) = input.name {
            lead.name = name.trim().to_string();
        }
        if input.email.is_some() {
            lead.email = clean(input.email).map(|e| e.to_lowercase());
        }
        if input.phone.is_some() {
            lead.phone = clean(input.phone);
        }
        if input.source.is_some() {
            lead.source = clean(input.source);
        }
        if let Some(lead_type) = input.lead_type {
            lead.lead_type = lead_type;
        }
        if input.language.is_some() {
            lead.language = clean(input.language);
        }
        if input.location.is_some() {
            lead.location = clean(input.location);
        }
        if let Some(received_at) = input.received_at {
            lead.received_at = received_at;
        }
        lead.updated_at = Utc::now();

        Ok(self.lead_repo.update(&lead).await?)
    }

    async fn delete(&self, _caller: Caller, id: i64) -> Result<(), LeadError> {
        self.find(id).await?;
        self.lead_repo.delete(id).await?;
        tracing::info!(lead_id = id, "Lead deleted");
        Ok(())
    }

    async fn assign(&self, caller: Caller, id: i64, employee_id: i64) -> Result<Lead, LeadError> {
        let mut lead = self.find(id).await?;
        let employee = self.active_employee(employee_id).await?;

        lead.assigned_to = Some(employee.id);
        lead.updated_at = Utc::now();
        let lead = self.lead_repo.update(&lead).await?;
        tracing::info!(lead_id = lead.id, user_id = employee.id, "Lead assigned");

        let actor = actor_for(self.user_repo.as_ref(), &caller).await;
        let payload = ActivityPayload::LeadAssigned(LeadAssigned {
            lead_name: lead.name.clone(),
            employee_name: employee.name,
            assigned_by: actor.name.clone(),
        });
        record_quietly(self.activities.as_ref(), payload, actor).await;

        Ok(lead)
    }

    async fn update_status(
        &self,
        caller: Caller,
        id: i64,
        status: LeadStatus,
    ) -> Result<Lead, LeadError> {
        let lead = self.find(id).await?;
        if !caller.is_admin() && !lead.is_assigned_to(caller.id) {
            return Err(LeadError::Forbidden);
        }
        if !lead.status.can_transition_to(status) {
            return Err(LeadError::InvalidTransition {
                from: lead.status,
                to: status,
            });
        }
        if lead.status == status {
            return Ok(lead);
        }

        let lead = match self.lead_repo.update_status(id, lead.status, status).await? {
            Some(lead) => lead,
            // Another request moved it first
            None => {
                let current = self.find(id).await?;
                return Err(LeadError::InvalidTransition {
                    from: current.status,
                    to: status,
                });
            }
        };
        tracing::info!(lead_id = lead.id, status = %lead.status, "Lead status changed");

        let actor = actor_for(self.user_repo.as_ref(), &caller).await;
        let payload = if status == LeadStatus::Closed {
            let employee_name = match self.assignee_name(&lead).await {
                Some(name) => name,
                None => actor.name.clone().unwrap_or_else(|| "Someone".to_string()),
            };
            ActivityPayload::DealClosed(DealClosed {
                lead_name: lead.name.clone(),
                employee_name,
                amount: None,
            })
        } else {
            ActivityPayload::LeadStatusChanged(LeadStatusChanged {
                lead_name: lead.name.clone(),
                status,
                changed_by: actor.name.clone(),
            })
        };
        record_quietly(self.activities.as_ref(), payload, actor).await;

        Ok(lead)
    }
}
