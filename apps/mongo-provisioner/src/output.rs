//! Human-readable rendering of run reports

use domain_provisioning::{ProvisionReport, ProvisionStatus, UserOutcome};

fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}

pub fn render_report(report: &ProvisionReport) -> String {
    let trail: Vec<String> = report.stages.iter().map(ToString::to_string).collect();
    let outcome = match report.user_outcome {
        Some(UserOutcome::Created) => "created",
        Some(UserOutcome::Updated {
            password_applied: true,
        }) => "updated",
        Some(UserOutcome::Updated {
            password_applied: false,
        }) => "updated (roles only)",
        Some(UserOutcome::UpdateFailed) => "update failed",
        None => "untouched",
    };

    let mut lines = vec![
        format!(
            "Provisioning {} for user {} ({})",
            report.database, report.username, report.role
        ),
        format!("  stages:   {}", trail.join(" -> ")),
        format!("  user:     {}", outcome),
        format!("  duration: {}ms", report.duration_ms),
    ];

    for failure in &report.failures {
        let severity = if failure.fatal { "error" } else { "warning" };
        lines.push(format!(
            "  {} [{}/{}]: {}",
            severity, failure.step, failure.category, failure.message
        ));
        lines.push(format!("    hint: {}", failure.hint));
    }

    lines.push(if report.is_success() { "OK" } else { "FAILED" }.to_string());
    lines.join("\n")
}

pub fn render_status(status: &ProvisionStatus) -> String {
    let mut lines = vec![
        format!("Database {}", status.database),
        format!("  listed: {}", yes_no(status.database_listed)),
    ];

    match &status.user {
        Some(user) => {
            let roles: Vec<String> = user.roles.iter().map(ToString::to_string).collect();
            lines.push(format!("User {} in {}", user.user, user.db));
            lines.push(format!("  roles: {}", roles.join(", ")));
            lines.push(format!("  has target role: {}", yes_no(status.has_role)));
        }
        None => lines.push(format!("User {} not found", status.username)),
    }

    let verdict = if status.is_provisioned() {
        "PROVISIONED"
    } else {
        "NOT PROVISIONED"
    };
    lines.push(verdict.to_string());
    lines.join("\n")
}
