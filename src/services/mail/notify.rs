use htmlescape::{encode_attribute, encode_minimal as escape_html};
use lettre::Message;
use lettre::message::{Mailbox, MultiPart, SinglePart};

use crate::repos::LeaveDetails;
use crate::services::approval::token::ApprovalAction;
use crate::services::auth::otp::OTP_TTL_SECONDS;
use crate::services::mail::MailError;

pub const RESET_SUBJECT: &str = "Your Password Reset OTP - Leave Management System";

/// Decision notice sent to the employee.
pub fn build_decision_message(
    from: Mailbox,
    to: Mailbox,
    leave: &LeaveDetails,
    action: ApprovalAction,
    frontend_url: &str,
) -> Result<Message, MailError> {
    let outcome = action.resulting_status();
    let subject = format!("Your leave request has been {outcome}");

    let text = format!(
        "Hello {name},\n\
         \n\
         Your {leave_type} leave request from {start} to {end} ({days} day(s)) has been {outcome} by {manager}.\n\
         \n\
         View your requests: {frontend_url}\n\
         \n\
         This is an automated notification from the Leave Management System.",
        name = leave.employee_name,
        leave_type = leave.leave_type,
        start = leave.start_date,
        end = leave.end_date,
        days = leave.days,
        manager = leave.manager_name,
    );

    let color = match action {
        ApprovalAction::Approve => "#28a745",
        ApprovalAction::Reject => "#dc3545",
    };
    let html = format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>{subject}</title></head>
<body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333; max-width: 600px; margin: 0 auto; padding: 20px;">
<h1 style="color: {color}; font-size: 22px;">Leave request {outcome}</h1>
<p>Hello {name},</p>
<p>Your <strong>{leave_type}</strong> leave request from {start} to {end} ({days} day(s)) has been <strong>{outcome}</strong> by {manager}.</p>
<p><a href="{link}">View your requests</a></p>
<p style="font-size: 14px; color: #666;">This is an automated notification from the Leave Management System.</p>
</body>
</html>
"#,
        name = escape_html(&leave.employee_name),
        leave_type = escape_html(&leave.leave_type),
        start = leave.start_date,
        end = leave.end_date,
        days = leave.days,
        manager = escape_html(&leave.manager_name),
        link = encode_attribute(frontend_url),
    );

    let message = Message::builder()
        .from(from)
        .to(to)
        .subject(subject)
        .multipart(MultiPart::alternative_plain_html(text, html))?;
    Ok(message)
}

/// Password reset OTP email (plain text + HTML).
pub fn build_reset_otp_message(from: Mailbox, to: Mailbox, otp: &str) -> Result<Message, MailError> {
    let minutes = OTP_TTL_SECONDS / 60;

    let text = format!(
        "Password Reset Request - Leave Management System\n\
         \n\
         You have requested to reset your password.\n\
         \n\
         Your One-Time Password (OTP) is: {otp}\n\
         \n\
         Important:\n\
         - This OTP expires in {minutes} minutes\n\
         - You can only use this OTP once\n\
         - If you didn't request this, please ignore this email\n\
         \n\
         This is an automated message. Please do not reply to this email."
    );

    let html = format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>Password Reset OTP</title></head>
<body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333; max-width: 600px; margin: 0 auto; padding: 20px;">
<h1 style="font-size: 24px;">Password Reset Request</h1>
<p>You have requested to reset your password for the Leave Management System.</p>
<p style="font-weight: bold; color: #666;">Your One-Time Password (OTP) is:</p>
<h2 style="font-size: 32px; letter-spacing: 8px; color: #667eea; font-family: 'Courier New', monospace;">{otp}</h2>
<ul>
<li>This OTP expires in <strong>{minutes} minutes</strong></li>
<li>You can only use this OTP <strong>once</strong></li>
<li>If you didn't request this, please ignore this email</li>
</ul>
<p style="font-size: 14px; color: #666;">This is an automated message. Please do not reply to this email.</p>
</body>
</html>
"#,
        otp = escape_html(otp),
    );

    let message = Message::builder()
        .from(from)
        .to(to)
        .subject(RESET_SUBJECT)
        .multipart(MultiPart::alternative_plain_html(text, html))?;
    Ok(message)
}
