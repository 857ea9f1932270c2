use super::Agent::{Designer, JuniorDev, Manager, SeniorDev};
use super::{Line, Scenario};

const fn line(speaker: super::Agent, text: &'static str) -> Line {
    Line { speaker, text }
}

const TEAM_MEETING: &[Line] = &[
    line(Manager, "Thanks for joining. We have three months to ship the fitness tracker app, and a competitor is already in the store."),
    line(SeniorDev, "Three months is tight but workable if we cut scope early. I'd start with workout logging and sync, and leave social features for later."),
    line(Designer, "I can have the core flows wireframed by the end of next week. I'd like one round of user testing before we lock the navigation."),
    line(JuniorDev, "Could I take the workout logging screens? I've been wanting to get deeper into the offline storage layer."),
    line(SeniorDev, "Sure, let's pair on the storage schema first so the sync work doesn't fight it later."),
    line(Manager, "Good. Let's set a checkpoint in two weeks and decide then what moves to the second release."),
];

const TECHNICAL_DISCUSSION: &[Line] = &[
    line(Manager, "We need to pick a stack today: React Native with Firebase, or Flutter with AWS."),
    line(SeniorDev, "Our team has shipped two React Native apps. Firebase gets us auth and sync almost for free, which matters on this timeline."),
    line(JuniorDev, "Flutter's rendering is smoother for the charts we want, though. I've read the animation story is much better."),
    line(Designer, "The charts are the heart of the product, so I do care about that. Can React Native hit sixty frames on the history view?"),
    line(SeniorDev, "With a native charting module, yes. Learning Flutter and AWS at the same time is the bigger risk."),
    line(Manager, "Then React Native and Firebase, with a one-week spike on chart performance before we commit fully."),
];

const DESIGN_REVIEW: &[Line] = &[
    line(Designer, "Here's the first pass: minimal screens, full dark mode, and a ring-based view of weekly progress."),
    line(Manager, "It looks clean. Does it still get the daily goal in front of people on the first screen?"),
    line(Designer, "Yes, the inner ring is today's goal and the outer ring is the week."),
    line(SeniorDev, "The rings are doable, but the animated transitions between days will take real effort. Can we start with a simple fade?"),
    line(JuniorDev, "The contrast on some of the dark mode labels looks low to me. Might be worth checking against accessibility guidelines."),
    line(Designer, "Good catch, I'll bump the contrast and ship the fade version first."),
];

const CONFLICT_RESOLUTION: &[Line] = &[
    line(Manager, "We're behind schedule and I've heard some frustration. I'd like to get it all on the table."),
    line(JuniorDev, "Honestly, I keep getting the bug-fix tickets while the interesting features go elsewhere."),
    line(Designer, "From my side, designs keep coming back for changes after they've been signed off."),
    line(SeniorDev, "And I feel we're cutting corners on tests to hit dates, which will cost us more later."),
    line(Manager, "Fair points. Feature tickets will rotate, design changes after sign-off come through me, and we'll budget a day per sprint for test debt."),
    line(SeniorDev, "That works. I'll pair with the new feature owner on the first rotation."),
];

const CASUAL_CHAT: &[Line] = &[
    line(JuniorDev, "Anyone doing anything fun this weekend?"),
    line(Designer, "I'm heading to a pottery class. My mugs so far are more like bowls."),
    line(SeniorDev, "Finally finishing that sci-fi trilogy everyone keeps recommending."),
    line(Manager, "Hiking if the weather holds. Then probably a long nap."),
    line(JuniorDev, "I might actually try the app's beta on a run. Strictly for research."),
    line(Designer, "Send me screenshots of the rings!"),
];

pub(super) fn builtin() -> Vec<Scenario> {
    vec![
        Scenario {
            id: "team_meeting",
            name: "Team meeting",
            description: "The team discusses project progress and problems",
            prompt: "The team is kicking off a new mobile app for fitness enthusiasts. It must ship within three months and competitors already have similar products. Discuss planning, ownership and the challenges ahead.",
            script: TEAM_MEETING,
        },
        Scenario {
            id: "technical_discussion",
            name: "Technical discussion",
            description: "Choosing the technology stack for the project",
            prompt: "The team must choose between React Native with Firebase and Flutter with AWS, weighing experience, requirements, performance, development speed and maintenance.",
            script: TECHNICAL_DISCUSSION,
        },
        Scenario {
            id: "design_review",
            name: "Design review",
            description: "The team reviews the proposed design",
            prompt: "The designer has finished the first UI pass: a minimal interface, dark mode support and a new way to visualise fitness data. Developers assess effort, the manager checks direction, and everyone considers the user experience.",
            script: DESIGN_REVIEW,
        },
        Scenario {
            id: "conflict_resolution",
            name: "Conflict resolution",
            description: "Resolving disagreements between team members",
            prompt: "The project is behind plan and disagreements have surfaced over task allocation, late design changes and quality under time pressure. The manager needs to get the project back on track.",
            script: CONFLICT_RESOLUTION,
        },
        Scenario {
            id: "casual_chat",
            name: "Casual chat",
            description: "A relaxed conversation between team members",
            prompt: "It's Friday afternoon and the team is chatting about weekend plans, hobbies, and recent films and books.",
            script: CASUAL_CHAT,
        },
    ]
}
