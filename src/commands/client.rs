use super::{
    Deleted, Output, StatsResult, money, parse_labels, parse_optional, parse_optional_datetime,
    to_json,
};
use crate::cli::{ClientFields, ClientFilterArgs, PageArgs};
use crate::engine::{ClientFilter, FilterSpec};
use crate::models::{Budget, Client, ClientDraft, ClientPatch, ClientStatus, EntityKind, NoteType};
use crate::remote::RemoteBackend;
use crate::service::{Brokerage, Page};
use crate::Result;

impl Output for Client {
    fn to_json(&self) -> String {
        to_json(self)
    }

    fn to_human(&self) -> String {
        let mut lines = vec![format!("{}: {} [{}]", self.id, self.full_name(), self.status)];
        lines.push(format!(
            "  Type: {}  Source: {}",
            self.client_type, self.source
        ));
        let mut contact = vec![self.email.clone()];
        if !self.phone.is_empty() {
            contact.push(self.phone.clone());
        }
        lines.push(format!("  Contact: {}", contact.join(", ")));
        if let Some(ref budget) = self.budget {
            let bound = |value: Option<f64>| value.map(money).unwrap_or_else(|| "-".to_string());
            lines.push(format!(
                "  Budget: {} to {}{}",
                bound(budget.min),
                bound(budget.max),
                if budget.pre_approved { " (pre-approved)" } else { "" }
            ));
        }
        if let Some(timeline) = self.timeline {
            lines.push(format!("  Timeline: {}", timeline));
        }
        if let Some(follow_up) = self.next_follow_up {
            lines.push(format!("  Next follow-up: {}", follow_up.format("%Y-%m-%d %H:%M")));
        }
        if let Some(ref agent) = self.agent_id {
            lines.push(format!("  Agent: {}", agent));
        }
        if !self.tags.is_empty() {
            lines.push(format!("  Tags: {}", self.tags.join(", ")));
        }
        if !self.property_interests.is_empty() {
            lines.push(format!("  Interested in: {}", self.property_interests.join(", ")));
        }
        if !self.transactions.is_empty() {
            lines.push(format!("  Transactions: {}", self.transactions.join(", ")));
        }
        if !self.notes.is_empty() {
            lines.push(format!("  Notes ({}):", self.notes.len()));
            for note in &self.notes {
                lines.push(format!(
                    "    [{}] {} ({}, {})",
                    note.note_type,
                    note.content,
                    note.author,
                    note.created_at.format("%Y-%m-%d")
                ));
            }
        }
        lines.join("\n")
    }
}

impl Output for Page<Client> {
    fn to_json(&self) -> String {
        to_json(self)
    }

    fn to_human(&self) -> String {
        if self.items.is_empty() {
            return format!("No clients found (page {} of {}).", self.page, self.total_pages);
        }
        let mut lines = vec![format!(
            "{} clients (page {} of {}):",
            self.total, self.page, self.total_pages
        )];
        for client in &self.items {
            lines.push(format!(
                "  {}  [{}] {}  {}  {}",
                client.id,
                client.status,
                client.full_name(),
                client.client_type,
                client.email
            ));
        }
        lines.join("\n")
    }
}

/// Translate client filter flags into a filter spec.
pub fn client_filter(args: &ClientFilterArgs) -> Result<FilterSpec> {
    let filter = ClientFilter {
        statuses: parse_labels(&args.status)?,
        types: parse_labels(&args.client_type)?,
        sources: parse_labels(&args.source)?,
        min_budget: args.min_budget,
        max_budget: args.max_budget,
        tags: args.tag.clone(),
        agent_id: args.agent.clone(),
        follow_up_before: parse_optional_datetime(args.follow_up_before.as_deref())?,
        search: args.search.clone(),
    };
    Ok(filter.to_spec())
}

fn budget_from(base: Option<&Budget>, fields: &ClientFields) -> Option<Budget> {
    if fields.budget_min.is_none() && fields.budget_max.is_none() && !fields.pre_approved {
        return None;
    }
    let mut budget = base.cloned().unwrap_or_default();
    if fields.budget_min.is_some() {
        budget.min = fields.budget_min;
    }
    if fields.budget_max.is_some() {
        budget.max = fields.budget_max;
    }
    if fields.pre_approved {
        budget.pre_approved = true;
    }
    Some(budget)
}

pub fn client_create<B: RemoteBackend>(
    brokerage: &mut Brokerage<B>,
    first_name: &str,
    last_name: &str,
    email: &str,
    follow_up: Option<&str>,
    fields: &ClientFields,
) -> Result<Client> {
    let draft = ClientDraft {
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        email: email.to_string(),
        phone: fields.phone.clone().unwrap_or_default(),
        client_type: parse_optional(fields.client_type.as_deref())?.unwrap_or_default(),
        source: parse_optional(fields.source.as_deref())?.unwrap_or_default(),
        budget: budget_from(None, fields),
        timeline: parse_optional(fields.timeline.as_deref())?,
        next_follow_up: parse_optional_datetime(follow_up)?,
        tags: fields.tags.clone(),
        agent_id: fields.agent.clone(),
    };
    brokerage.create_client(draft)
}

pub fn client_list<B: RemoteBackend>(
    brokerage: &Brokerage<B>,
    filter: &ClientFilterArgs,
    page: &PageArgs,
) -> Result<Page<Client>> {
    brokerage.list_clients(&client_filter(filter)?, page.page, page.limit)
}

pub fn client_show<B: RemoteBackend>(brokerage: &Brokerage<B>, id: &str) -> Result<Client> {
    brokerage.get_client(id)
}

/// Apply the given flags as a patch. Budget flags merge into the existing budget.
pub fn client_update<B: RemoteBackend>(
    brokerage: &mut Brokerage<B>,
    id: &str,
    first_name: Option<&str>,
    last_name: Option<&str>,
    email: Option<&str>,
    fields: &ClientFields,
) -> Result<Client> {
    let current = brokerage.get_client(id)?;
    let patch = ClientPatch {
        first_name: first_name.map(str::to_string),
        last_name: last_name.map(str::to_string),
        email: email.map(str::to_string),
        phone: fields.phone.clone(),
        client_type: parse_optional(fields.client_type.as_deref())?,
        source: parse_optional(fields.source.as_deref())?,
        budget: budget_from(current.budget.as_ref(), fields),
        timeline: parse_optional(fields.timeline.as_deref())?,
        tags: (!fields.tags.is_empty()).then(|| fields.tags.clone()),
        agent_id: fields.agent.clone(),
    };
    brokerage.update_client(id, &patch)
}

pub fn client_status<B: RemoteBackend>(
    brokerage: &mut Brokerage<B>,
    id: &str,
    status: &str,
) -> Result<Client> {
    let status: ClientStatus = status.parse()?;
    brokerage.set_client_status(id, status)
}

pub fn client_delete<B: RemoteBackend>(brokerage: &mut Brokerage<B>, id: &str) -> Result<Deleted> {
    let client = brokerage.delete_client(id)?;
    Ok(Deleted {
        entity: EntityKind::Client,
        id: client.id,
        deleted: true,
    })
}

pub fn client_note<B: RemoteBackend>(
    brokerage: &mut Brokerage<B>,
    id: &str,
    content: &str,
    note_type: &str,
    author: &str,
) -> Result<Client> {
    let note_type: NoteType = note_type.parse()?;
    brokerage.add_client_note(id, content, note_type, author)
}

/// Schedule a follow-up, or clear it when `at` is `None`.
pub fn client_follow_up<B: RemoteBackend>(
    brokerage: &mut Brokerage<B>,
    id: &str,
    at: Option<&str>,
) -> Result<Client> {
    let when = parse_optional_datetime(at)?;
    brokerage.schedule_follow_up(id, when)
}

pub fn client_interest_add<B: RemoteBackend>(
    brokerage: &mut Brokerage<B>,
    id: &str,
    property_id: &str,
) -> Result<Client> {
    brokerage.add_property_interest(id, property_id)
}

pub fn client_interest_remove<B: RemoteBackend>(
    brokerage: &mut Brokerage<B>,
    id: &str,
    property_id: &str,
) -> Result<Client> {
    brokerage.remove_property_interest(id, property_id)
}

pub fn client_stats<B: RemoteBackend>(
    brokerage: &Brokerage<B>,
    filter: &ClientFilterArgs,
) -> Result<StatsResult> {
    Ok(StatsResult {
        entity: EntityKind::Client,
        stats: brokerage.client_stats(&client_filter(filter)?)?,
    })
}
