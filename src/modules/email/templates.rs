use crate::modules::otp::OtpPurpose;

/// A rendered message ready for a notifier
#[derive(Debug, Clone, PartialEq)]
pub struct EmailContent {
    pub subject: String,
    pub body: String,
}

/// Render the OTP email for `purpose`
pub fn otp_email(code: &str, purpose: OtpPurpose, ttl_minutes: i64) -> EmailContent {
    let (subject, heading, intro, label, ignore_note) = match purpose {
        OtpPurpose::Registration => (
            "SAT Portal - Email Verification OTP",
            "SAT Portal - Email Verification",
            "Thank you for registering with SAT Portal!",
            "Your verification OTP is:",
            "If you didn't request this registration, please ignore this email.",
        ),
        OtpPurpose::PasswordReset => (
            "SAT Portal - Password Reset OTP",
            "SAT Portal - Password Reset",
            "You requested a password reset for your SAT Portal account.",
            "Your reset OTP is:",
            "If you didn't request this reset, please ignore this email.",
        ),
    };

    let body = format!(
        "<html>\n\
         <body>\n\
         <h2>{heading}</h2>\n\
         <p>{intro}</p>\n\
         <p>{label} <strong style=\"font-size: 24px; color: #007bff;\">{code}</strong></p>\n\
         <p>This OTP will expire in {ttl_minutes} minutes.</p>\n\
         <p>{ignore_note}</p>\n\
         <br>\n\
         <p>Best regards,<br>SAT Portal Team</p>\n\
         </body>\n\
         </html>\n",
        heading = heading,
        intro = intro,
        label = label,
        code = code,
        ttl_minutes = ttl_minutes,
        ignore_note = ignore_note,
    );

    EmailContent {
        subject: subject.to_string(),
        body,
    }
}

/// Body for the `mail-test` command
pub fn configuration_test_email() -> EmailContent {
    EmailContent {
        subject: "SAT Portal - Email Configuration Test".to_string(),
        body: "<html><body><p>This is a test email to verify your SMTP configuration.</p></body></html>"
            .to_string(),
    }
}
