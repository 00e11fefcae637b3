//! Email templates for invitations.

/// Content for invitation emails.
pub struct InvitationEmailContent {
    pub subject: String,
    pub text: String,
    pub html: String,
}

impl InvitationEmailContent {
    /// Invitation (or renewal) for an Authorized Official.
    pub fn ao_invitation(organization_name: &str) -> Self {
        Self {
            subject: format!("Register {organization_name} for the DPC API"),
            text: Self::ao_text(organization_name),
            html: Self::html_shell(
                "You're invited to register your organization",
                &format!(
                    "<p>You have been identified as the Authorized Official for \
                     <strong>{organization_name}</strong>.</p>\
                     <p>Sign in to the DPC Portal to verify your identity and manage access \
                     to the Data at the Point of Care API. This invitation expires in 48 hours.</p>"
                ),
            ),
        }
    }

    /// Invitation for a Credential Delegate; carries the one-time code the
    /// invitee confirms during acceptance.
    pub fn cd_invitation(organization_name: &str, verification_code: &str) -> Self {
        Self {
            subject: format!("Manage DPC API credentials for {organization_name}"),
            text: Self::cd_text(organization_name, verification_code),
            html: Self::html_shell(
                "You're invited to manage API credentials",
                &format!(
                    "<p>An Authorized Official for <strong>{organization_name}</strong> has \
                     invited you to manage credentials for the Data at the Point of Care API.</p>\
                     <p>Your verification code is:</p>\
                     <div class=\"code\">{verification_code}</div>\
                     <p class=\"expires\">This invitation expires in 48 hours.</p>"
                ),
            ),
        }
    }

    fn ao_text(organization_name: &str) -> String {
        format!(
            r#"You have been identified as the Authorized Official for {organization_name}.

Sign in to the DPC Portal to verify your identity and manage access to the
Data at the Point of Care API.

This invitation expires in 48 hours.

--
DPC Portal Team"#
        )
    }

    fn cd_text(organization_name: &str, verification_code: &str) -> String {
        format!(
            r#"An Authorized Official for {organization_name} has invited you to manage
credentials for the Data at the Point of Care API.

Your verification code is: {verification_code}

This invitation expires in 48 hours.

--
DPC Portal Team"#
        )
    }

    fn html_shell(heading: &str, body: &str) -> String {
        format!(
            r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <style>
        body {{ font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; line-height: 1.6; color: #333; margin: 0; padding: 0; background: #f5f5f5; }}
        .container {{ max-width: 600px; margin: 0 auto; padding: 40px 20px; }}
        .card {{ background: white; border-radius: 8px; padding: 40px; box-shadow: 0 2px 4px rgba(0,0,0,0.1); }}
        h1 {{ color: #1a1a1a; margin-top: 0; font-size: 24px; }}
        .code {{ font-size: 36px; font-weight: bold; letter-spacing: 8px; color: #205493; text-align: center; padding: 24px; background: #f0f7ff; border-radius: 8px; margin: 24px 0; font-family: 'SF Mono', Monaco, monospace; }}
        .expires {{ color: #666; font-size: 14px; }}
        .footer {{ margin-top: 32px; padding-top: 20px; border-top: 1px solid #eee; color: #888; font-size: 12px; }}
    </style>
</head>
<body>
    <div class="container">
        <div class="card">
            <h1>{heading}</h1>
            {body}
            <div class="footer">
                <p>If you weren't expecting this invitation, please ignore this email.</p>
                <p>DPC Portal Team</p>
            </div>
        </div>
    </div>
</body>
</html>"#
        )
    }
}
