//! Leave-action email composition.
//!
//! The manager email has three alternatives: plain text, AMP (interactive
//! approve/reject form) and HTML. AMP and HTML come from disk templates when
//! those render cleanly; otherwise both use the inline HTML below.

use htmlescape::{encode_attribute, encode_minimal as escape_html};
use lettre::Message;
use lettre::message::{Mailbox, MultiPart, SinglePart, header::ContentType};
use serde::Serialize;

use crate::config::PublicUrls;
use crate::repos::LeaveDetails;
use crate::services::approval::token::ApprovalLinks;
use crate::services::mail::MailError;
use crate::services::mail::mailer::AmpSourceOrigin;
use crate::services::mail::templates::{AMP_TEMPLATE, EmailTemplates, HTML_TEMPLATE};

const NOT_AVAILABLE: &str = "N/A";

/// Rendered AMP output shorter than this is treated as broken.
pub const MIN_AMP_LEN: usize = 100;

/// Template context, exposed to templates as `leave`.
#[derive(Debug, Clone, Serialize)]
pub struct LeaveEmailContext {
    pub id: String,
    pub employee_id: String,
    pub manager_id: String,
    pub employee_name: String,
    pub employee_department: String,
    pub manager_email: String,
    pub leave_type: String,
    pub start_date: String,
    pub end_date: String,
    pub days: String,
    pub total_days: String,
    pub reason: String,
    pub status: String,
    pub approval_token: String,
    pub rejection_token: String,
    pub backend_url: String,
    pub frontend_url: String,
    pub approve_url: String,
    pub reject_url: String,
}

impl LeaveEmailContext {
    pub fn new(leave: &LeaveDetails, links: &ApprovalLinks, urls: &PublicUrls) -> Self {
        let days = leave.days.to_string();
        Self {
            id: leave.id.to_string(),
            employee_id: leave.employee_id.to_string(),
            manager_id: leave.manager_id.to_string(),
            employee_name: leave.employee_name.clone(),
            employee_department: or_na(leave.employee_department.as_deref()),
            manager_email: leave.manager_email.clone(),
            leave_type: leave.leave_type.clone(),
            start_date: leave.start_date.to_string(),
            end_date: leave.end_date.to_string(),
            total_days: days.clone(),
            days,
            reason: or_na(leave.reason.as_deref()),
            status: leave.status.clone(),
            approval_token: links.approval_token.clone(),
            rejection_token: links.rejection_token.clone(),
            backend_url: urls.backend.clone(),
            frontend_url: urls.frontend.clone(),
            approve_url: decision_url(&urls.backend, &leave.id.to_string(), "approve", &links.approval_token),
            reject_url: decision_url(&urls.backend, &leave.id.to_string(), "reject", &links.rejection_token),
        }
    }
}

fn or_na(value: Option<&str>) -> String {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => NOT_AVAILABLE.to_string(),
    }
}

pub fn decision_url(backend: &str, leave_id: &str, action: &str, token: &str) -> String {
    format!(
        "{backend}/api/leave/{leave_id}/{action}?token={}",
        urlencoding::encode(token)
    )
}

/// Why the inline bodies were used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    NoTemplates,
    RenderFailed(String),
    AmpTooShort(usize),
    Unrendered,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodySource {
    Templates,
    Inline(FallbackReason),
}

#[derive(Debug, Clone)]
pub struct RenderedBodies {
    pub amp: String,
    pub html: String,
    pub source: BodySource,
}

/// Render the AMP and HTML bodies, falling back to inline HTML for both.
pub fn render_bodies(ctx: &LeaveEmailContext, templates: Option<&EmailTemplates>) -> RenderedBodies {
    let Some(templates) = templates else {
        return inline_bodies(ctx, FallbackReason::NoTemplates);
    };

    let rendered = templates
        .render_leave(AMP_TEMPLATE, ctx)
        .and_then(|amp| templates.render_leave(HTML_TEMPLATE, ctx).map(|html| (amp, html)));

    let (amp, html) = match rendered {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(error = %e, "email template rendering failed, using inline template");
            return inline_bodies(ctx, FallbackReason::RenderFailed(e.to_string()));
        }
    };

    if amp.len() < MIN_AMP_LEN {
        tracing::warn!(len = amp.len(), "AMP content too short, using inline template");
        return inline_bodies(ctx, FallbackReason::AmpTooShort(amp.len()));
    }
    if amp.contains("{{ leave.") {
        tracing::warn!("AMP template has unrendered variables, using inline template");
        return inline_bodies(ctx, FallbackReason::Unrendered);
    }

    tracing::debug!(amp_len = amp.len(), html_len = html.len(), "email templates rendered");
    RenderedBodies {
        amp,
        html,
        source: BodySource::Templates,
    }
}

fn inline_bodies(ctx: &LeaveEmailContext, reason: FallbackReason) -> RenderedBodies {
    let html = inline_html(ctx);
    RenderedBodies {
        amp: html.clone(),
        html,
        source: BodySource::Inline(reason),
    }
}

/// `Leave Request {Status} - {employee}`.
pub fn leave_action_subject(ctx: &LeaveEmailContext) -> String {
    let status = title_case(&ctx.status);
    let status = if status.is_empty() { "Approval".to_string() } else { status };
    let name = if ctx.employee_name.trim().is_empty() {
        "Employee"
    } else {
        ctx.employee_name.trim()
    };
    format!("Leave Request {status} - {name}")
}

pub fn leave_action_text(ctx: &LeaveEmailContext) -> String {
    format!(
        "Leave Request Approval Required\n\
         \n\
         Employee: {}\n\
         Department: {}\n\
         Leave Type: {}\n\
         Start Date: {}\n\
         End Date: {}\n\
         Days: {}\n\
         Reason: {}\n\
         \n\
         To approve this leave request, visit:\n\
         {}\n\
         \n\
         To reject it, visit:\n\
         {}\n\
         \n\
         This is an automated notification from the Leave Management System.",
        ctx.employee_name,
        ctx.employee_department,
        ctx.leave_type,
        ctx.start_date,
        ctx.end_date,
        ctx.days,
        ctx.reason,
        ctx.approve_url,
        ctx.reject_url,
    )
}

/// Assemble the `multipart/alternative` message (text, AMP, HTML).
pub fn build_leave_action_message(
    from: Mailbox,
    to: Mailbox,
    amp_source_origin: &str,
    ctx: &LeaveEmailContext,
    bodies: RenderedBodies,
) -> Result<Message, MailError> {
    let amp_type = ContentType::parse("text/x-amp-html; charset=utf-8")
        .map_err(|e| MailError::Content(e.to_string()))?;

    let message = Message::builder()
        .from(from)
        .to(to)
        .subject(leave_action_subject(ctx))
        .header(AmpSourceOrigin(amp_source_origin.to_string()))
        .multipart(
            MultiPart::alternative()
                .singlepart(SinglePart::plain(leave_action_text(ctx)))
                .singlepart(SinglePart::builder().header(amp_type).body(bodies.amp))
                .singlepart(SinglePart::html(bodies.html)),
        )?;

    Ok(message)
}

fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

fn inline_html(ctx: &LeaveEmailContext) -> String {
    let rows = [
        ("Employee", &ctx.employee_name),
        ("Department", &ctx.employee_department),
        ("Leave Type", &ctx.leave_type),
        ("Start Date", &ctx.start_date),
        ("End Date", &ctx.end_date),
        ("Days", &ctx.days),
        ("Reason", &ctx.reason),
    ]
    .iter()
    .enumerate()
    .map(|(i, (label, value))| {
        let shade = if i % 2 == 0 { " style=\"background: #f0f0f0;\"" } else { "" };
        format!(
            "<tr{shade}><td style=\"padding: 10px; border: 1px solid #ddd; font-weight: bold;\">{label}:</td>\
             <td style=\"padding: 10px; border: 1px solid #ddd;\">{}</td></tr>",
            escape_html(value)
        )
    })
    .collect::<Vec<_>>()
    .join("\n");

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>Leave Request Approval</title>
</head>
<body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333; max-width: 600px; margin: 0 auto; padding: 20px;">
<div style="background: #667eea; color: white; padding: 20px; border-radius: 10px 10px 0 0; text-align: center;">
<h1 style="margin: 0; font-size: 24px;">Leave Request Approval Required</h1>
</div>
<div style="background: #f9f9f9; padding: 30px; border-radius: 0 0 10px 10px; border: 1px solid #ddd;">
<h2 style="margin-top: 0;">Leave Request Details</h2>
<table style="width: 100%; border-collapse: collapse; margin: 20px 0;">
{rows}
</table>
<div style="text-align: center; margin: 30px 0;">
<a href="{approve}" style="background: #28a745; color: white; padding: 12px 30px; text-decoration: none; border-radius: 5px; margin: 0 10px; display: inline-block; font-weight: bold;">APPROVE</a>
<a href="{reject}" style="background: #dc3545; color: white; padding: 12px 30px; text-decoration: none; border-radius: 5px; margin: 0 10px; display: inline-block; font-weight: bold;">REJECT</a>
</div>
<p style="font-size: 14px; color: #666; margin-top: 30px;">This is an automated notification. Use one of the buttons above to approve or reject this leave request.</p>
</div>
</body>
</html>
"#,
        approve = encode_attribute(&ctx.approve_url),
        reject = encode_attribute(&ctx.reject_url),
    )
}
